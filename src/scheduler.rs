//! Spaced-repetition scheduler
//!
//! Pure function from a card's review state and a self-rated answer to
//! its next state. No I/O; the current time is an explicit input.
//!
//! The interval for a correct answer is computed from the *pre-update*
//! step and streak, so interval growth and mastery lag the rating that
//! earned them by one review. That compounding reward for consecutive
//! correct answers is intentional, as are the asymmetric base
//! multipliers (6h / 3h / 1.5h).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ease value assigned to a card that has never been studied
pub const INITIAL_STEP: f64 = 2.0;

/// Step at or above which a card counts as mastered
pub const MASTERY_THRESHOLD: f64 = 5.0;

const HOUR_MS: f64 = 3_600_000.0;

/// Learner's self-rated recall of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    Easy,
    Normal,
    Hard,
    DidntKnow,
}

impl Rating {
    /// Ease gained by a correct answer
    fn step_delta(self) -> f64 {
        match self {
            Rating::Easy => 0.5,
            Rating::Normal => 0.3,
            Rating::Hard => 0.1,
            Rating::DidntKnow => -0.2,
        }
    }

    /// Base interval in hours for a correct answer
    fn base_hours(self) -> f64 {
        match self {
            Rating::Easy => 6.0,
            Rating::Normal => 3.0,
            Rating::Hard => 1.5,
            Rating::DidntKnow => 0.5,
        }
    }
}

/// A card's review state before an answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewState {
    pub step: f64,
    pub streak: i64,
    pub mastered: bool,
}

impl ReviewState {
    pub fn new() -> Self {
        Self {
            step: INITIAL_STEP,
            streak: 0,
            mastered: false,
        }
    }
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::new()
    }
}

/// A card's review state after an answer, with the next due time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledReview {
    pub step: f64,
    pub streak: i64,
    pub mastered: bool,
    pub next_review: DateTime<Utc>,
}

/// Compute the next review state for a rated answer.
///
/// Deterministic: equal inputs yield equal outputs. The exponential
/// interval outgrows chrono's range around streak 38; past that the
/// due time saturates at `DateTime::<Utc>::MAX_UTC` instead of
/// overflowing.
pub fn next_state(current: ReviewState, rating: Rating, now: DateTime<Utc>) -> ScheduledReview {
    match rating {
        Rating::Easy | Rating::Normal | Rating::Hard => {
            let step = current.step + rating.step_delta();
            let streak = current.streak + 1;
            let mastered = current.mastered || step >= MASTERY_THRESHOLD;

            // Interval from the pre-update step and streak
            let growth = 2f64.powi(current.streak.min(i32::MAX as i64) as i32);
            let interval_ms = (rating.base_hours() * HOUR_MS * current.step * growth).floor();

            ScheduledReview {
                step,
                streak,
                mastered,
                next_review: due_at(now, interval_ms),
            }
        }
        Rating::DidntKnow => {
            // Full streak reset; mastery is sticky and survives a lapse
            let interval_ms = (rating.base_hours() * HOUR_MS * current.step).floor();

            ScheduledReview {
                step: (current.step + rating.step_delta()).max(0.0),
                streak: 0,
                mastered: current.mastered,
                next_review: due_at(now, interval_ms),
            }
        }
    }
}

/// Due time for an interval in milliseconds; the float cast saturates
/// and the add clamps at the top of chrono's range.
fn due_at(now: DateTime<Utc>, interval_ms: f64) -> DateTime<Utc> {
    now.checked_add_signed(Duration::milliseconds(interval_ms as i64))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
