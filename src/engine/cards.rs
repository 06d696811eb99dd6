//! Card operations: create, edit, delete, with mirror fan-out

use bson::doc;
use tracing::{debug, info};

use super::{validate_card_text, Engine};
use crate::db::schemas::CardDoc;
use crate::guard::Principal;
use crate::types::{CardwayError, Result};

impl Engine {
    /// Create a card on a deck the caller may edit directly.
    ///
    /// On a canonical deck the card becomes canonical immediately and a
    /// mirror is created in every fork; a private deck gets no fan-out.
    pub async fn create_card(
        &self,
        caller: &Principal,
        deck_id: &str,
        front: &str,
        back: &str,
        img: Option<String>,
        audio: Option<String>,
    ) -> Result<CardDoc> {
        validate_card_text(front, back)?;

        let deck = self.deck_or_not_found(deck_id).await?;
        if !deck.can_edit_directly(&caller.user_id) {
            return Err(CardwayError::forbidden(
                "cards can only be added to your own non-fork decks",
            ));
        }

        let mut card = CardDoc::new(
            deck.id.clone(),
            front.to_string(),
            back.to_string(),
            img,
            audio,
        );
        if deck.is_canonical() {
            card.public_id = Some(card.id.clone());
        }
        self.store.cards.insert_one(card.clone()).await?;

        if deck.is_canonical() {
            let forks = self.forks_of(&deck.id).await?;
            for fork in &forks {
                self.store.cards.insert_one(card.mirror_for(&fork.id)).await?;
            }
            info!(card_id = %card.id, forks = forks.len(), "card created and mirrored");
        } else {
            debug!(card_id = %card.id, "card created");
        }

        Ok(card)
    }

    /// Edit a card's content; changes propagate to every mirror,
    /// leaving mirror progress untouched. Idempotent.
    pub async fn edit_card(
        &self,
        caller: &Principal,
        card_id: &str,
        front: &str,
        back: &str,
    ) -> Result<CardDoc> {
        validate_card_text(front, back)?;

        let mut card = self.card_or_not_found(card_id).await?;
        let deck = self.deck_or_not_found(&card.deck_id).await?;
        if !deck.can_edit_directly(&caller.user_id) {
            return Err(CardwayError::forbidden(
                "mirrored cards are only changed by propagation",
            ));
        }

        let patch = doc! { "$set": { "front": front, "back": back } };

        // Origin first, then all mirrors in one batch
        self.store
            .cards
            .update_one(doc! { "id": &card.id }, patch.clone())
            .await?;
        let mirrors = self
            .store
            .cards
            .update_many(
                doc! { "public_id": &card.id, "id": { "$ne": &card.id } },
                patch,
            )
            .await?;

        debug!(card_id = %card.id, mirrors, "card edited");
        card.front = front.to_string();
        card.back = back.to_string();
        Ok(card)
    }

    /// Delete a card and every mirror descended from it
    pub async fn delete_card(&self, caller: &Principal, card_id: &str) -> Result<()> {
        let card = self.card_or_not_found(card_id).await?;
        let deck = self.deck_or_not_found(&card.deck_id).await?;
        if !deck.can_edit_directly(&caller.user_id) {
            return Err(CardwayError::forbidden(
                "mirrored cards are only removed by propagation",
            ));
        }

        let mirrors = self
            .store
            .cards
            .delete_many(doc! { "public_id": &card.id, "id": { "$ne": &card.id } })
            .await?;
        self.store.cards.delete_one(doc! { "id": &card.id }).await?;

        info!(card_id = %card.id, mirrors, "card deleted");
        Ok(())
    }
}
