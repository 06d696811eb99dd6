//! MongoDB client and collection wrapper
//!
//! Production implementation of the persistence port. Collections
//! apply their schema-defined indexes on creation.

use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::StreamExt;
use mongodb::{Client, Collection as MongoColl, IndexModel};
use tracing::{error, info};

use crate::db::store::{Collection, DocSchema};
use crate::types::{CardwayError, Result};

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CardwayError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CardwayError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T: DocSchema>(&self, name: &str) -> Result<MongoCollection<T>> {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T: DocSchema> {
    inner: MongoColl<T>,
}

impl<T: DocSchema> MongoCollection<T> {
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| CardwayError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &MongoColl<T> {
        &self.inner
    }
}

#[async_trait]
impl<T: DocSchema> Collection<T> for MongoCollection<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.find_one(doc! { "id": id }).await
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| CardwayError::Database(format!("Find failed: {}", e)))
    }

    async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| CardwayError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    async fn insert_one(&self, mut item: T) -> Result<String> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(bson::DateTime::now());
        metadata.updated_at = Some(bson::DateTime::now());

        let id = item.id().to_string();

        self.inner
            .insert_one(item)
            .await
            .map_err(|e| CardwayError::Database(format!("Insert failed: {}", e)))?;

        Ok(id)
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<u64> {
        let result = self
            .inner
            .update_one(filter, update)
            .await
            .map_err(|e| CardwayError::Database(format!("Update failed: {}", e)))?;

        Ok(result.matched_count)
    }

    async fn update_many(&self, filter: Document, update: Document) -> Result<u64> {
        let result = self
            .inner
            .update_many(filter, update)
            .await
            .map_err(|e| CardwayError::Database(format!("Update failed: {}", e)))?;

        Ok(result.matched_count)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| CardwayError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self
            .inner
            .delete_many(filter)
            .await
            .map_err(|e| CardwayError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }
}
