//! Study sessions
//!
//! Applies the scheduler to a batch of rated answers and accrues
//! experience. Authorization is checked per card before any write: a
//! batch containing a card from someone else's deck is rejected whole,
//! leaving every card and the experience counter untouched.

use std::collections::HashMap;

use bson::doc;
use chrono::{DateTime, Utc};
use tracing::info;

use super::Engine;
use crate::db::schemas::CardDoc;
use crate::guard::Principal;
use crate::scheduler::{next_state, Rating, ReviewState};
use crate::types::{CardwayError, Result};

/// Experience multiplier for a mastered card
const XP_MASTERED: i64 = 10;

/// Experience multiplier for an unmastered card
const XP_LEARNING: i64 = 5;

/// Result of a study session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyOutcome {
    pub cards_reviewed: usize,
    pub experience_gained: i64,
}

impl Engine {
    /// Record a batch of rated answers.
    ///
    /// Every card's owning deck must belong to the caller; the whole
    /// batch is validated before the first write. A card rated more
    /// than once in a batch is folded forward: each answer starts from
    /// the state the previous one produced. Per answer the gained
    /// experience is `streak × 10` when the card is mastered after the
    /// answer, `streak × 5` otherwise; the sum is added once to the
    /// caller's experience counter.
    pub async fn study_session(
        &self,
        caller: &Principal,
        answers: &[(String, Rating)],
        now: DateTime<Utc>,
    ) -> Result<StudyOutcome> {
        // Validate the full batch up front; nothing is written on failure
        let mut cards: Vec<(CardDoc, Rating)> = Vec::with_capacity(answers.len());
        for (card_id, rating) in answers {
            let card = self.card_or_not_found(card_id).await?;
            let deck = self.deck_or_not_found(&card.deck_id).await?;
            if deck.owner_user_id != caller.user_id {
                return Err(CardwayError::forbidden(
                    "cannot study a card from someone else's deck",
                ));
            }
            cards.push((card, *rating));
        }

        let mut experience_gained = 0_i64;
        let mut folded: HashMap<&str, ReviewState> = HashMap::new();
        for (card, rating) in &cards {
            let current = folded.get(card.id.as_str()).copied().unwrap_or(ReviewState {
                step: card.step,
                streak: card.streak,
                mastered: card.mastered,
            });
            let scheduled = next_state(current, *rating, now);
            folded.insert(
                card.id.as_str(),
                ReviewState {
                    step: scheduled.step,
                    streak: scheduled.streak,
                    mastered: scheduled.mastered,
                },
            );

            self.store
                .cards
                .update_one(
                    doc! { "id": &card.id },
                    doc! { "$set": {
                        "step": scheduled.step,
                        "streak": scheduled.streak,
                        "mastered": scheduled.mastered,
                        "next_review": bson::DateTime::from_chrono(scheduled.next_review),
                    } },
                )
                .await?;

            let multiplier = if scheduled.mastered {
                XP_MASTERED
            } else {
                XP_LEARNING
            };
            experience_gained += scheduled.streak * multiplier;
        }

        if experience_gained > 0 {
            self.store
                .users
                .update_one(
                    doc! { "id": &caller.user_id },
                    doc! { "$inc": { "experience": experience_gained } },
                )
                .await?;
        }

        info!(
            user = %caller.user_id,
            cards = cards.len(),
            experience = experience_gained,
            "study session recorded"
        );

        Ok(StudyOutcome {
            cards_reviewed: cards.len(),
            experience_gained,
        })
    }
}
