//! Access guard
//!
//! Resolves caller identity from a bearer token and answers the read
//! visibility question for decks and cards. Mutation-side ownership
//! checks live with the operations themselves, since authorization
//! there is per entity.

use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::db::schemas::DeckDoc;
use crate::types::{CardwayError, Result};

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub name: String,
}

/// Token-to-principal resolution
#[derive(Clone)]
pub struct AccessGuard {
    keys: JwtKeys,
}

impl AccessGuard {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }

    /// Resolve a caller; never errors. An absent, malformed, expired,
    /// or non-access token yields `None` and the caller decides whether
    /// anonymous access is permitted.
    pub fn authenticate(&self, token: Option<&str>) -> Option<Principal> {
        let claims = self.keys.verify(token?).ok()?;
        if claims.kind != TokenKind::Access {
            return None;
        }
        Some(Principal {
            user_id: claims.sub,
            name: claims.name,
        })
    }

    /// Resolve a caller or fail with `Unauthorized`
    pub fn require_principal(&self, token: Option<&str>) -> Result<Principal> {
        self.authenticate(token).ok_or(CardwayError::Unauthorized)
    }
}

/// Whether `viewer` may read this deck.
///
/// Owners read their own decks; everyone else (including anonymous
/// callers) only reads canonical decks. A bare fork is private to its
/// owner. A card is readable iff its deck is.
pub fn deck_readable(deck: &DeckDoc, viewer: Option<&Principal>) -> bool {
    if let Some(p) = viewer {
        if deck.owner_user_id == p.user_id {
            return true;
        }
    }
    deck.is_canonical()
}
