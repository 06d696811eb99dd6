//! Card document schema
//!
//! A card's `public_id` mirrors the deck convention but is keyed on the
//! canonical *card's* id: `None` for cards on private decks, the card's
//! own id on a canonical deck, and the canonical card's id for a mirror
//! inside a fork. Content fields (front/back/media) are replicated by
//! propagation; progress fields (step, streak, mastered, next_review)
//! belong to one learner and never cross deck boundaries.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schemas::Metadata;
use crate::db::store::{HasId, IntoIndexes, MutMetadata};
use crate::scheduler::INITIAL_STEP;

/// Collection name for cards
pub const CARD_COLLECTION: &str = "cards";

/// Maximum front/back text length
pub const MAX_CARD_TEXT_LEN: usize = 255;

/// Where a card sits in its lineage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardLineage {
    /// Card on a private deck, no lineage
    Unlinked,
    /// Canonical instance on a published deck
    Canonical,
    /// Mirror inside a fork; carries the canonical card's id
    Mirror(String),
}

/// Card document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CardDoc {
    /// Application-level id (UUID v4)
    pub id: String,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning deck
    pub deck_id: String,

    /// Prompt side
    pub front: String,

    /// Answer side
    pub back: String,

    /// Optional image URL
    #[serde(default)]
    pub img: Option<String>,

    /// Optional audio URL
    #[serde(default)]
    pub audio: Option<String>,

    /// Lineage key; see module docs
    #[serde(default)]
    pub public_id: Option<String>,

    /// Ease measure, grows with correct answers
    #[serde(default = "default_step")]
    pub step: f64,

    /// Consecutive correct answers
    #[serde(default)]
    pub streak: i64,

    /// Sticky mastery flag
    #[serde(default)]
    pub mastered: bool,

    /// When the card is next due; `None` until first studied
    #[serde(default)]
    pub next_review: Option<DateTime>,
}

fn default_step() -> f64 {
    INITIAL_STEP
}

impl CardDoc {
    /// Create a new card with fresh progress
    pub fn new(
        deck_id: String,
        front: String,
        back: String,
        img: Option<String>,
        audio: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            deck_id,
            front,
            back,
            img,
            audio,
            public_id: None,
            step: INITIAL_STEP,
            streak: 0,
            mastered: false,
            next_review: None,
        }
    }

    /// Create the mirror of this card for a fork deck.
    ///
    /// Content is copied; progress starts fresh, since progress belongs
    /// to the learner, not the lineage.
    pub fn mirror_for(&self, fork_deck_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            deck_id: fork_deck_id.to_string(),
            front: self.front.clone(),
            back: self.back.clone(),
            img: self.img.clone(),
            audio: self.audio.clone(),
            public_id: Some(self.id.clone()),
            step: INITIAL_STEP,
            streak: 0,
            mastered: false,
            next_review: None,
        }
    }

    /// Resolve the lineage position of this card
    pub fn lineage(&self) -> CardLineage {
        match &self.public_id {
            None => CardLineage::Unlinked,
            Some(p) if *p == self.id => CardLineage::Canonical,
            Some(p) => CardLineage::Mirror(p.clone()),
        }
    }

    pub fn is_mirror(&self) -> bool {
        matches!(self.lineage(), CardLineage::Mirror(_))
    }
}

impl HasId for CardDoc {
    fn id(&self) -> &str {
        &self.id
    }
}

impl IntoIndexes for CardDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("id_unique".to_string())
                        .build(),
                ),
            ),
            // Cards of a deck
            (doc! { "deck_id": 1 }, None),
            // Mirror fan-out lookups
            (doc! { "public_id": 1 }, None),
        ]
    }
}

impl MutMetadata for CardDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_card_progress_defaults() {
        let c = CardDoc::new("deck-1".into(), "犬".into(), "dog".into(), None, None);
        assert_eq!(c.step, INITIAL_STEP);
        assert_eq!(c.streak, 0);
        assert!(!c.mastered);
        assert!(c.next_review.is_none());
        assert_eq!(c.lineage(), CardLineage::Unlinked);
    }

    #[test]
    fn test_mirror_copies_content_not_progress() {
        let mut canonical = CardDoc::new("deck-1".into(), "犬".into(), "dog".into(), None, None);
        canonical.public_id = Some(canonical.id.clone());
        canonical.step = 4.5;
        canonical.streak = 7;
        canonical.mastered = true;

        let mirror = canonical.mirror_for("fork-deck");
        assert_eq!(mirror.front, "犬");
        assert_eq!(mirror.back, "dog");
        assert_eq!(mirror.deck_id, "fork-deck");
        assert_eq!(mirror.lineage(), CardLineage::Mirror(canonical.id.clone()));
        assert_eq!(mirror.step, INITIAL_STEP);
        assert_eq!(mirror.streak, 0);
        assert!(!mirror.mastered);
        assert!(mirror.next_review.is_none());
    }
}
