//! User document schema
//!
//! Stores learner credentials, experience, and follow lists.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schemas::Metadata;
use crate::db::store::{HasId, IntoIndexes, MutMetadata};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Maximum display name length
pub const MAX_NAME_LEN: usize = 20;

/// User document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// Application-level id (UUID v4)
    pub id: String,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Login email, unique
    pub email: String,

    /// Argon2 password hash (PHC string)
    pub password_hash: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Learner level (presentation only, never touched by the core)
    #[serde(default = "default_level")]
    pub level: i64,

    /// Experience points accrued by study sessions
    #[serde(default)]
    pub experience: i64,

    /// Users following this user
    #[serde(default)]
    pub followers: Vec<String>,

    /// Users this user follows
    #[serde(default)]
    pub following: Vec<String>,
}

fn default_level() -> i64 {
    1
}

impl UserDoc {
    /// Create a fresh user with no experience and empty follow lists
    pub fn new(email: String, password_hash: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            email,
            password_hash,
            name,
            level: 1,
            experience: 0,
            followers: Vec::new(),
            following: Vec::new(),
        }
    }
}

impl HasId for UserDoc {
    fn id(&self) -> &str {
        &self.id
    }
}

impl IntoIndexes for UserDoc {
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
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
