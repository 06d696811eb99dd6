//! Refresh token schema
//!
//! Persisted, expiring refresh-token store keyed by the token's `jti`.
//! A refresh token whose signature verifies but which is absent from
//! this collection (revoked) or past its expiry is invalid. Persisting
//! tokens rather than holding them in process memory keeps validity
//! consistent across restarts and multiple instances.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::schemas::Metadata;
use crate::db::store::{HasId, IntoIndexes, MutMetadata};

/// Collection name for refresh tokens
pub const REFRESH_TOKEN_COLLECTION: &str = "refresh_tokens";

/// Refresh token document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RefreshTokenDoc {
    /// Token id (the JWT `jti` claim)
    pub id: String,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: String,

    /// When the token expires
    #[serde(default = "default_expires_at")]
    pub expires_at: DateTime<Utc>,
}

fn default_expires_at() -> DateTime<Utc> {
    Utc::now()
}

impl RefreshTokenDoc {
    pub fn new(jti: String, user_id: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: jti,
            metadata: Metadata::new(),
            user_id,
            expires_at,
        }
    }

    /// Check whether the token is still usable
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

impl HasId for RefreshTokenDoc {
    fn id(&self) -> &str {
        &self.id
    }
}

impl IntoIndexes for RefreshTokenDoc {
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
            // Revoke-all-for-user lookups
            (doc! { "user_id": 1 }, None),
        ]
    }
}

impl MutMetadata for RefreshTokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
