//! Deck operations: create, publish/unpublish, fork, edit, quit, reset

use bson::{doc, Bson};
use tracing::{debug, info};

use super::{validate_title, Engine};
use crate::db::schemas::{CardDoc, DeckDoc, Lineage};
use crate::guard::{deck_readable, Principal};
use crate::scheduler::INITIAL_STEP;
use crate::types::{CardwayError, Result};

/// Input for `create_deck`
#[derive(Debug, Clone)]
pub struct NewDeck {
    pub title: String,
    pub category_id: String,
    pub img: Option<String>,
}

impl Engine {
    /// Create a new private deck
    pub async fn create_deck(&self, caller: &Principal, input: NewDeck) -> Result<DeckDoc> {
        validate_title(&input.title)?;
        self.category_or_not_found(&input.category_id).await?;

        let deck = DeckDoc::new(
            input.title,
            caller.user_id.clone(),
            input.category_id,
            input.img,
        );
        self.store.decks.insert_one(deck.clone()).await?;

        debug!(deck_id = %deck.id, owner = %caller.user_id, "deck created");
        Ok(deck)
    }

    /// Publish a private deck, making it the canonical root of a new
    /// lineage. Idempotent on an already-canonical deck; a fork can
    /// never be published.
    pub async fn publish_deck(&self, caller: &Principal, deck_id: &str) -> Result<DeckDoc> {
        let mut deck = self.owned_deck(caller, deck_id).await?;

        match deck.lineage() {
            Lineage::Canonical => return Ok(deck),
            Lineage::Fork(_) => {
                return Err(CardwayError::forbidden("a fork cannot be published"))
            }
            Lineage::Private => {}
        }

        // Canonical row first, then its cards
        self.store
            .decks
            .update_one(
                doc! { "id": &deck.id },
                doc! { "$set": { "public_id": &deck.id } },
            )
            .await?;
        deck.public_id = Some(deck.id.clone());

        let cards = self
            .store
            .cards
            .find_many(doc! { "deck_id": &deck.id })
            .await?;
        for card in &cards {
            self.store
                .cards
                .update_one(
                    doc! { "id": &card.id },
                    doc! { "$set": { "public_id": &card.id } },
                )
                .await?;
        }

        info!(deck_id = %deck.id, cards = cards.len(), "deck published");
        Ok(deck)
    }

    /// Unpublish a canonical deck, dissolving the whole lineage into
    /// independent private decks. Forks survive with their owners; only
    /// the lineage pointers are cleared.
    pub async fn unpublish_deck(&self, caller: &Principal, deck_id: &str) -> Result<DeckDoc> {
        let mut deck = self.owned_deck(caller, deck_id).await?;
        if !deck.is_canonical() {
            return Err(CardwayError::forbidden(
                "only a canonical deck can be unpublished",
            ));
        }

        // Collect forks before clearing the pointer they are keyed on
        let forks = self.forks_of(&deck.id).await?;

        self.dissolve(&deck.id).await?;
        for fork in &forks {
            self.dissolve(&fork.id).await?;
        }
        deck.public_id = None;

        info!(deck_id = %deck.id, forks = forks.len(), "lineage dissolved");
        Ok(deck)
    }

    /// Fork a published deck for a learner.
    ///
    /// Resolves any deck in the lineage to its canonical root.
    /// Idempotent: a learner who already owns a deck in the lineage
    /// (the canonical included) gets that deck back unchanged.
    pub async fn copy_deck(&self, caller: &Principal, deck_id: &str) -> Result<DeckDoc> {
        let source = self.deck_or_not_found(deck_id).await?;

        let canonical = match source.lineage() {
            Lineage::Private => {
                return Err(CardwayError::forbidden("deck is not published"))
            }
            Lineage::Canonical => source,
            Lineage::Fork(origin_id) => self.deck_or_not_found(&origin_id).await?,
        };

        if let Some(existing) = self
            .store
            .decks
            .find_one(doc! {
                "owner_user_id": &caller.user_id,
                "public_id": &canonical.id,
            })
            .await?
        {
            debug!(deck_id = %existing.id, "re-fork returned existing deck");
            return Ok(existing);
        }

        let fork = DeckDoc::fork_of(&canonical, caller.user_id.clone());
        self.store.decks.insert_one(fork.clone()).await?;

        let cards = self
            .store
            .cards
            .find_many(doc! { "deck_id": &canonical.id })
            .await?;
        for card in &cards {
            self.store.cards.insert_one(card.mirror_for(&fork.id)).await?;
        }

        info!(
            deck_id = %fork.id,
            origin = %canonical.id,
            cards = cards.len(),
            "deck forked"
        );
        Ok(fork)
    }

    /// Edit deck title/category. Canonical edits propagate to every
    /// fork; private edits stay local; forks cannot be edited.
    pub async fn edit_deck(
        &self,
        caller: &Principal,
        deck_id: &str,
        title: &str,
        category_id: &str,
    ) -> Result<DeckDoc> {
        validate_title(title)?;
        self.category_or_not_found(category_id).await?;

        let mut deck = self.owned_deck(caller, deck_id).await?;
        let patch = doc! { "$set": { "title": title, "category_id": category_id } };

        match deck.lineage() {
            Lineage::Fork(_) => {
                return Err(CardwayError::forbidden("a fork cannot be edited directly"))
            }
            Lineage::Private => {
                self.store
                    .decks
                    .update_one(doc! { "id": &deck.id }, patch)
                    .await?;
            }
            Lineage::Canonical => {
                // Canonical first, then mirrors in one batch
                self.store
                    .decks
                    .update_one(doc! { "id": &deck.id }, patch.clone())
                    .await?;
                self.store
                    .decks
                    .update_many(
                        doc! { "public_id": &deck.id, "id": { "$ne": &deck.id } },
                        patch,
                    )
                    .await?;
            }
        }

        deck.title = title.to_string();
        deck.category_id = category_id.to_string();
        Ok(deck)
    }

    /// Remove a deck from the caller's collection.
    ///
    /// Quitting a canonical deck dissolves every fork first (as
    /// `unpublish` does), then deletes the canonical deck and its
    /// cards. Quitting a private deck or a fork deletes only the deck
    /// document; its cards stay behind as the owner's orphaned cards.
    pub async fn quit_deck(&self, caller: &Principal, deck_id: &str) -> Result<()> {
        let deck = self.owned_deck(caller, deck_id).await?;

        if deck.is_canonical() {
            let forks = self.forks_of(&deck.id).await?;
            for fork in &forks {
                self.dissolve(&fork.id).await?;
            }

            self.store
                .cards
                .delete_many(doc! { "deck_id": &deck.id })
                .await?;
            self.store.decks.delete_one(doc! { "id": &deck.id }).await?;

            info!(deck_id = %deck.id, forks = forks.len(), "canonical deck quit, lineage dissolved");
        } else {
            self.store.decks.delete_one(doc! { "id": &deck.id }).await?;
            info!(deck_id = %deck.id, "deck quit");
        }

        Ok(())
    }

    /// Reset every card in the caller's deck to fresh progress. Never
    /// propagated: progress is per deck instance.
    pub async fn reset_deck(&self, caller: &Principal, deck_id: &str) -> Result<u64> {
        let deck = self.owned_deck(caller, deck_id).await?;

        self.store
            .cards
            .update_many(
                doc! { "deck_id": &deck.id },
                doc! { "$set": {
                    "step": INITIAL_STEP,
                    "streak": 0_i64,
                    "mastered": false,
                    "next_review": Bson::Null,
                } },
            )
            .await
    }

    /// Clear the lineage pointer on a deck and all its cards. Cards
    /// first so a concurrent reader never sees a private deck holding
    /// published cards.
    async fn dissolve(&self, deck_id: &str) -> Result<()> {
        self.store
            .cards
            .update_many(
                doc! { "deck_id": deck_id },
                doc! { "$set": { "public_id": Bson::Null } },
            )
            .await?;
        self.store
            .decks
            .update_one(
                doc! { "id": deck_id },
                doc! { "$set": { "public_id": Bson::Null } },
            )
            .await?;
        Ok(())
    }

    /// Cards of a deck the viewer may read: owners see their own
    /// decks, everyone else only canonical ones
    pub async fn deck_cards(
        &self,
        viewer: Option<&Principal>,
        deck_id: &str,
    ) -> Result<Vec<CardDoc>> {
        let deck = self.deck_or_not_found(deck_id).await?;
        if !deck_readable(&deck, viewer) {
            return Err(CardwayError::forbidden("deck is not visible to this caller"));
        }
        self.cards_of(deck_id).await
    }

    /// Unchecked card fetch for engine internals and tests
    pub(crate) async fn cards_of(&self, deck_id: &str) -> Result<Vec<CardDoc>> {
        self.store.cards.find_many(doc! { "deck_id": deck_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{engine, principal};
    use super::*;

    async fn published_deck_with_cards(
        eng: &Engine,
        category_id: &str,
        owner: &Principal,
        fronts: &[&str],
    ) -> DeckDoc {
        let deck = eng
            .create_deck(
                owner,
                NewDeck {
                    title: "Kanji".into(),
                    category_id: category_id.to_string(),
                    img: None,
                },
            )
            .await
            .unwrap();
        for front in fronts {
            eng.create_card(owner, &deck.id, front, "back", None, None)
                .await
                .unwrap();
        }
        eng.publish_deck(owner, &deck.id).await.unwrap()
    }

    /// L1: every non-null public_id resolves to exactly one canonical deck
    async fn assert_lineage_invariant(eng: &Engine) {
        let decks = eng.store().decks.find_many(doc! {}).await.unwrap();
        for deck in &decks {
            if let Some(p) = &deck.public_id {
                let canonical: Vec<_> = decks
                    .iter()
                    .filter(|d| d.id == *p && d.public_id.as_deref() == Some(p.as_str()))
                    .collect();
                assert_eq!(canonical.len(), 1, "no unique canonical root for {p}");
            }
        }
    }

    #[tokio::test]
    async fn test_create_deck_is_private() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");

        let deck = eng
            .create_deck(
                &owner,
                NewDeck {
                    title: "Kanji".into(),
                    category_id: cat,
                    img: None,
                },
            )
            .await
            .unwrap();

        assert!(deck.is_private());
        assert_eq!(deck.owner_user_id, "owner");
        assert_eq!(deck.created_by_user_id, "owner");
    }

    #[tokio::test]
    async fn test_create_deck_requires_title_and_category() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");

        let err = eng
            .create_deck(
                &owner,
                NewDeck {
                    title: "  ".into(),
                    category_id: cat,
                    img: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CardwayError::Validation(_)));

        let err = eng
            .create_deck(
                &owner,
                NewDeck {
                    title: "Kanji".into(),
                    category_id: "missing".into(),
                    img: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CardwayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_publish_marks_deck_and_cards_canonical() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a", "b"]).await;
        assert!(deck.is_canonical());

        let cards = eng.cards_of(&deck.id).await.unwrap();
        assert_eq!(cards.len(), 2);
        for card in cards {
            assert_eq!(card.public_id.as_deref(), Some(card.id.as_str()));
        }
        assert_lineage_invariant(&eng).await;
    }

    #[tokio::test]
    async fn test_double_publish_is_idempotent() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;
        let again = eng.publish_deck(&owner, &deck.id).await.unwrap();

        assert_eq!(again.id, deck.id);
        assert_eq!(again.public_id, deck.public_id);
        assert_lineage_invariant(&eng).await;
    }

    #[tokio::test]
    async fn test_copy_deck_mirrors_cards_with_fresh_progress() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a", "b", "c"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        assert!(fork.is_fork());
        assert_eq!(fork.owner_user_id, "learner");
        assert_eq!(fork.created_by_user_id, "owner");

        let source_cards = eng.cards_of(&deck.id).await.unwrap();
        let mirrors = eng.cards_of(&fork.id).await.unwrap();
        assert_eq!(mirrors.len(), source_cards.len());
        for mirror in &mirrors {
            let origin = source_cards
                .iter()
                .find(|c| Some(c.id.as_str()) == mirror.public_id.as_deref())
                .expect("mirror points at a source card");
            assert_eq!(mirror.front, origin.front);
            assert_eq!(mirror.step, INITIAL_STEP);
            assert_eq!(mirror.streak, 0);
            assert!(!mirror.mastered);
            assert!(mirror.next_review.is_none());
        }
        assert_lineage_invariant(&eng).await;
    }

    #[tokio::test]
    async fn test_copy_via_fork_resolves_canonical() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner_a = principal("a");
        let learner_b = principal("b");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;
        let fork_a = eng.copy_deck(&learner_a, &deck.id).await.unwrap();

        // Forking a fork lands on the canonical root
        let fork_b = eng.copy_deck(&learner_b, &fork_a.id).await.unwrap();
        assert_eq!(fork_b.public_id.as_deref(), Some(deck.id.as_str()));
        assert_lineage_invariant(&eng).await;
    }

    #[tokio::test]
    async fn test_re_fork_is_idempotent() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a", "b"]).await;
        let first = eng.copy_deck(&learner, &deck.id).await.unwrap();
        let second = eng.copy_deck(&learner, &deck.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(eng.cards_of(&first.id).await.unwrap().len(), 2);

        // The canonical owner "re-forking" gets the canonical back
        let own = eng.copy_deck(&owner, &deck.id).await.unwrap();
        assert_eq!(own.id, deck.id);
    }

    #[tokio::test]
    async fn test_copy_private_deck_forbidden() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = eng
            .create_deck(
                &owner,
                NewDeck {
                    title: "Secret".into(),
                    category_id: cat,
                    img: None,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            eng.copy_deck(&learner, &deck.id).await,
            Err(CardwayError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_unpublish_dissolves_whole_lineage() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a", "b"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        eng.unpublish_deck(&owner, &deck.id).await.unwrap();

        let former_canonical = eng.store().decks.find_by_id(&deck.id).await.unwrap().unwrap();
        let former_fork = eng.store().decks.find_by_id(&fork.id).await.unwrap().unwrap();
        assert!(former_canonical.is_private());
        assert!(former_fork.is_private());
        assert_eq!(former_fork.owner_user_id, "learner");

        for card in eng.cards_of(&deck.id).await.unwrap() {
            assert!(card.public_id.is_none());
        }
        for card in eng.cards_of(&fork.id).await.unwrap() {
            assert!(card.public_id.is_none());
        }
        assert_lineage_invariant(&eng).await;
    }

    #[tokio::test]
    async fn test_unpublish_requires_canonical() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        assert!(matches!(
            eng.unpublish_deck(&learner, &fork.id).await,
            Err(CardwayError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_deck_propagates_to_forks() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        eng.edit_deck(&owner, &deck.id, "Renamed", &cat).await.unwrap();

        let fork_after = eng.store().decks.find_by_id(&fork.id).await.unwrap().unwrap();
        assert_eq!(fork_after.title, "Renamed");

        // Editing the fork directly is rejected, even for its owner
        assert!(matches!(
            eng.edit_deck(&learner, &fork.id, "Mine", &cat).await,
            Err(CardwayError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_quit_canonical_dissolves_and_deletes() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a", "b"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        eng.quit_deck(&owner, &deck.id).await.unwrap();

        assert!(eng.store().decks.find_by_id(&deck.id).await.unwrap().is_none());
        assert!(eng.cards_of(&deck.id).await.unwrap().is_empty());

        // The fork survives as an independent private deck with its cards
        let fork_after = eng.store().decks.find_by_id(&fork.id).await.unwrap().unwrap();
        assert!(fork_after.is_private());
        let fork_cards = eng.cards_of(&fork.id).await.unwrap();
        assert_eq!(fork_cards.len(), 2);
        assert!(fork_cards.iter().all(|c| c.public_id.is_none()));
        assert_lineage_invariant(&eng).await;
    }

    #[tokio::test]
    async fn test_quit_fork_leaves_cards_behind() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a", "b"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        eng.quit_deck(&learner, &fork.id).await.unwrap();

        // Deck gone, cards deliberately not cascade-deleted
        assert!(eng.store().decks.find_by_id(&fork.id).await.unwrap().is_none());
        assert_eq!(eng.cards_of(&fork.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_deck_is_local() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        // Give the learner's mirror some progress, then reset the fork
        let mirrors = eng.cards_of(&fork.id).await.unwrap();
        let mirror = &mirrors[0];
        eng.store()
            .cards
            .update_one(
                doc! { "id": &mirror.id },
                doc! { "$set": { "step": 4.0, "streak": 5_i64, "mastered": true } },
            )
            .await
            .unwrap();

        let reset = eng.reset_deck(&learner, &fork.id).await.unwrap();
        assert_eq!(reset, 1);

        let mirror_after = eng.store().cards.find_by_id(&mirror.id).await.unwrap().unwrap();
        assert_eq!(mirror_after.step, INITIAL_STEP);
        assert_eq!(mirror_after.streak, 0);
        assert!(!mirror_after.mastered);

        // Canonical cards untouched
        let canonical_cards = eng.cards_of(&deck.id).await.unwrap();
        assert_eq!(canonical_cards.len(), 1);
        assert_eq!(
            canonical_cards[0].public_id.as_deref(),
            Some(canonical_cards[0].id.as_str())
        );
    }

    #[tokio::test]
    async fn test_deck_cards_visibility() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let learner = principal("learner");
        let stranger = principal("stranger");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;
        let fork = eng.copy_deck(&learner, &deck.id).await.unwrap();

        // Canonical cards are publicly browsable, anonymously too
        assert_eq!(eng.deck_cards(None, &deck.id).await.unwrap().len(), 1);
        assert_eq!(eng.deck_cards(Some(&stranger), &deck.id).await.unwrap().len(), 1);

        // Fork cards only for the fork's owner
        assert_eq!(eng.deck_cards(Some(&learner), &fork.id).await.unwrap().len(), 1);
        assert!(matches!(
            eng.deck_cards(Some(&stranger), &fork.id).await,
            Err(CardwayError::Forbidden(_))
        ));
        assert!(matches!(
            eng.deck_cards(None, &fork.id).await,
            Err(CardwayError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_ownership_enforced() {
        let (eng, cat) = engine().await;
        let owner = principal("owner");
        let stranger = principal("stranger");

        let deck = published_deck_with_cards(&eng, &cat, &owner, &["a"]).await;

        assert!(matches!(
            eng.publish_deck(&stranger, &deck.id).await,
            Err(CardwayError::Forbidden(_))
        ));
        assert!(matches!(
            eng.quit_deck(&stranger, &deck.id).await,
            Err(CardwayError::Forbidden(_))
        ));
        assert!(matches!(
            eng.reset_deck(&stranger, &deck.id).await,
            Err(CardwayError::Forbidden(_))
        ));
        assert!(matches!(
            eng.quit_deck(&owner, "missing").await,
            Err(CardwayError::NotFound(_))
        ));
    }
}
