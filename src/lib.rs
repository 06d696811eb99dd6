//! Cardway - content propagation and review scheduling for shared
//! flashcard decks
//!
//! Many independent learners study the "same" deck; Cardway gives each
//! of them a private, mutable fork kept loosely synchronized with the
//! canonical public deck it descends from, and schedules each card's
//! next review from the learner's self-rated recall.
//!
//! ## Components
//!
//! - **Scheduler** ([`scheduler`]): pure next-review computation
//! - **Lineage model** ([`db::schemas`]): canonical/fork/private
//!   predicates over decks and cards
//! - **Propagation engine** ([`engine`]): deck/card mutations with
//!   fan-out to forks
//! - **Access guard** ([`guard`]): token resolution and read visibility
//! - **Persistence port** ([`db`]): MongoDB-backed storage behind an
//!   abstract collection trait, with an in-memory twin for tests
//!
//! The transport layer (GraphQL/HTTP) that fronts the engine is out of
//! scope; it parses [`Args`], builds a [`db::Store`], and calls
//! [`Engine`] operations.

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod guard;
pub mod logging;
pub mod scheduler;
pub mod types;

pub use config::Args;
pub use engine::{Engine, NewDeck, StudyOutcome};
pub use guard::{AccessGuard, Principal};
pub use types::{CardwayError, Result};
