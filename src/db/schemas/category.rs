//! Category document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schemas::Metadata;
use crate::db::store::{HasId, IntoIndexes, MutMetadata};

/// Collection name for categories
pub const CATEGORY_COLLECTION: &str = "categories";

/// Category document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CategoryDoc {
    /// Application-level id (UUID v4)
    pub id: String,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,
}

impl CategoryDoc {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            name,
        }
    }
}

impl HasId for CategoryDoc {
    fn id(&self) -> &str {
        &self.id
    }
}

impl IntoIndexes for CategoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CategoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
