//! Deck document schema and lineage model
//!
//! A deck is either private (never published), canonical (the published
//! root of a lineage), or a fork (a learner's copy of a canonical
//! deck). The lineage key is the nullable `public_id` field: `None`
//! means private, the deck's own id means canonical, and any other id
//! names the canonical deck this fork descends from. Code never
//! branches on the raw field; it goes through [`Lineage`].
//!
//! Invariants:
//! - while any fork exists, exactly one deck in the lineage carries
//!   `public_id == id` (the canonical root);
//! - a user owns at most one deck per lineage.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schemas::Metadata;
use crate::db::store::{HasId, IntoIndexes, MutMetadata};

/// Collection name for decks
pub const DECK_COLLECTION: &str = "decks";

/// Cover image used when none is supplied
pub const DEFAULT_DECK_IMG: &str = "https://via.placeholder.com/100x70";

/// Where a deck sits in its lineage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lineage {
    /// Unpublished, no lineage
    Private,
    /// Published root of a lineage
    Canonical,
    /// Learner-owned copy; carries the canonical deck's id
    Fork(String),
}

/// Deck document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DeckDoc {
    /// Application-level id (UUID v4)
    pub id: String,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Deck title
    pub title: String,

    /// Current owner (the learner studying this instance)
    pub owner_user_id: String,

    /// Original author, preserved across forks
    pub created_by_user_id: String,

    /// Category reference
    pub category_id: String,

    /// Cover image URL
    #[serde(default = "default_img")]
    pub img: String,

    /// Lineage key; see module docs
    #[serde(default)]
    pub public_id: Option<String>,
}

fn default_img() -> String {
    DEFAULT_DECK_IMG.to_string()
}

impl DeckDoc {
    /// Create a new private deck
    pub fn new(
        title: String,
        owner_user_id: String,
        category_id: String,
        img: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            title,
            created_by_user_id: owner_user_id.clone(),
            owner_user_id,
            category_id,
            img: img.unwrap_or_else(default_img),
            public_id: None,
        }
    }

    /// Create a fork of a canonical deck, owned by `learner_id`
    pub fn fork_of(origin: &DeckDoc, learner_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            title: origin.title.clone(),
            owner_user_id: learner_id,
            created_by_user_id: origin.created_by_user_id.clone(),
            category_id: origin.category_id.clone(),
            img: origin.img.clone(),
            public_id: Some(origin.id.clone()),
        }
    }

    /// Resolve the lineage position of this deck
    pub fn lineage(&self) -> Lineage {
        match &self.public_id {
            None => Lineage::Private,
            Some(p) if *p == self.id => Lineage::Canonical,
            Some(p) => Lineage::Fork(p.clone()),
        }
    }

    pub fn is_private(&self) -> bool {
        self.public_id.is_none()
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self.lineage(), Lineage::Canonical)
    }

    pub fn is_fork(&self) -> bool {
        matches!(self.lineage(), Lineage::Fork(_))
    }

    /// Canonical root id for any deck in a lineage; `None` when private
    pub fn canonical_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    /// Whether `user_id` may mutate this deck's content directly.
    ///
    /// Forks are only ever mutated by propagation (learner progress on
    /// their cards aside), never by their owner.
    pub fn can_edit_directly(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id && !self.is_fork()
    }
}

impl HasId for DeckDoc {
    fn id(&self) -> &str {
        &self.id
    }
}

impl IntoIndexes for DeckDoc {
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
            // Owner's deck list
            (doc! { "owner_user_id": 1 }, None),
            // Fork fan-out lookups
            (doc! { "public_id": 1 }, None),
            // Idempotent re-fork check (owner, lineage) pairs
            (doc! { "owner_user_id": 1, "public_id": 1 }, None),
        ]
    }
}

impl MutMetadata for DeckDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
