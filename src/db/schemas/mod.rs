//! Database schemas for Cardway
//!
//! Defines document structures for users, decks, cards, categories,
//! and refresh tokens, plus the lineage model over decks and cards.

mod card;
mod category;
mod deck;
mod metadata;
mod token;
mod user;

pub use card::{CardDoc, CardLineage, CARD_COLLECTION, MAX_CARD_TEXT_LEN};
pub use category::{CategoryDoc, CATEGORY_COLLECTION};
pub use deck::{DeckDoc, Lineage, DECK_COLLECTION, DEFAULT_DECK_IMG};
pub use metadata::Metadata;
pub use token::{RefreshTokenDoc, REFRESH_TOKEN_COLLECTION};
pub use user::{UserDoc, MAX_NAME_LEN, USER_COLLECTION};
