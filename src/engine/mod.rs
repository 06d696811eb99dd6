//! Propagation engine
//!
//! Orchestrates multi-record writes so mutations on a canonical deck
//! fan out to its forks, and visibility transitions re-root or dissolve
//! a lineage. The fan-out ordering rule everywhere: the canonical or
//! origin record is written first, mirror writes afterward. Mirror
//! writes are independent rows; a failure mid fan-out surfaces as the
//! operation's error and leaves the remaining mirrors stale, which the
//! design accepts (mirrors are advisory, the canonical row is
//! authoritative).

mod cards;
mod decks;
mod study;
mod users;

pub use decks::NewDeck;
pub use study::StudyOutcome;

use bson::doc;

use crate::auth::TokenService;
use crate::db::schemas::{CardDoc, CategoryDoc, DeckDoc, MAX_CARD_TEXT_LEN, MAX_NAME_LEN};
use crate::db::Store;
use crate::guard::Principal;
use crate::types::{CardwayError, Result};

/// The operation surface exposed to the transport layer
#[derive(Clone)]
pub struct Engine {
    store: Store,
    tokens: TokenService,
}

impl Engine {
    pub fn new(store: Store, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) async fn deck_or_not_found(&self, deck_id: &str) -> Result<DeckDoc> {
        self.store
            .decks
            .find_by_id(deck_id)
            .await?
            .ok_or_else(|| CardwayError::not_found("deck", deck_id))
    }

    pub(crate) async fn card_or_not_found(&self, card_id: &str) -> Result<CardDoc> {
        self.store
            .cards
            .find_by_id(card_id)
            .await?
            .ok_or_else(|| CardwayError::not_found("card", card_id))
    }

    pub(crate) async fn category_or_not_found(&self, category_id: &str) -> Result<CategoryDoc> {
        self.store
            .categories
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| CardwayError::not_found("category", category_id))
    }

    /// Fetch a deck the caller must own
    pub(crate) async fn owned_deck(&self, caller: &Principal, deck_id: &str) -> Result<DeckDoc> {
        let deck = self.deck_or_not_found(deck_id).await?;
        if deck.owner_user_id != caller.user_id {
            return Err(CardwayError::forbidden("deck belongs to another user"));
        }
        Ok(deck)
    }

    /// All fork decks of a canonical deck, excluding the canonical itself
    pub(crate) async fn forks_of(&self, canonical_id: &str) -> Result<Vec<DeckDoc>> {
        self.store
            .decks
            .find_many(doc! {
                "public_id": canonical_id,
                "id": { "$ne": canonical_id },
            })
            .await
    }
}

pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CardwayError::Validation("title is required".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_card_text(front: &str, back: &str) -> Result<()> {
    if front.trim().is_empty() || back.trim().is_empty() {
        return Err(CardwayError::Validation(
            "card front and back are required".to_string(),
        ));
    }
    if front.len() > MAX_CARD_TEXT_LEN || back.len() > MAX_CARD_TEXT_LEN {
        return Err(CardwayError::Validation(format!(
            "card text exceeds {MAX_CARD_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(CardwayError::Validation(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::auth::JwtKeys;
    use crate::db::schemas::CategoryDoc;

    /// Engine over a fresh in-memory store
    pub async fn engine() -> (Engine, String) {
        let store = Store::memory();
        let category = CategoryDoc::new("Languages".to_string());
        let category_id = store
            .categories
            .insert_one(category)
            .await
            .expect("seed category");

        let tokens = TokenService::new(
            JwtKeys::new("test-secret"),
            900,
            86_400,
            store.tokens.clone(),
        );
        (Engine::new(store, tokens), category_id)
    }

    pub fn principal(user_id: &str) -> Principal {
        Principal {
            user_id: user_id.to_string(),
            name: user_id.to_string(),
        }
    }
}
