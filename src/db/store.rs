//! Persistence port
//!
//! The engine talks to storage through the [`Collection`] trait: plain
//! CRUD over bson filter documents restricted to equality, `$in`,
//! `$ne`, and `$exists` predicates, with `$set`/`$inc`/`$unset`
//! patches. Two implementations exist: [`crate::db::MongoCollection`]
//! for production and [`crate::db::MemoryCollection`] for tests.

use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use mongodb::options::IndexOptions;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::memory::MemoryCollection;
use crate::db::mongo::MongoClient;
use crate::db::schemas::{
    CardDoc, CategoryDoc, DeckDoc, Metadata, RefreshTokenDoc, UserDoc, CARD_COLLECTION,
    CATEGORY_COLLECTION, DECK_COLLECTION, REFRESH_TOKEN_COLLECTION, USER_COLLECTION,
};
use crate::types::Result;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Trait for schemas carrying an application-level id
pub trait HasId {
    fn id(&self) -> &str;
}

/// Bound alias for documents the port can store
pub trait DocSchema:
    Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + HasId + MutMetadata + IntoIndexes + 'static
{
}

impl<T> DocSchema for T where
    T: Serialize
        + DeserializeOwned
        + Clone
        + Send
        + Sync
        + Unpin
        + HasId
        + MutMetadata
        + IntoIndexes
        + 'static
{
}

/// Abstract collection interface (the persistence port)
#[async_trait]
pub trait Collection<T: DocSchema>: Send + Sync {
    /// Find one document by its application-level id
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Find one document matching the filter
    async fn find_one(&self, filter: Document) -> Result<Option<T>>;

    /// Find all documents matching the filter
    async fn find_many(&self, filter: Document) -> Result<Vec<T>>;

    /// Insert a document, stamping metadata timestamps; returns its id
    async fn insert_one(&self, item: T) -> Result<String>;

    /// Apply a patch to the first matching document; returns matched count
    async fn update_one(&self, filter: Document, update: Document) -> Result<u64>;

    /// Apply a patch to every matching document; returns matched count
    async fn update_many(&self, filter: Document, update: Document) -> Result<u64>;

    /// Delete the first matching document; returns deleted count
    async fn delete_one(&self, filter: Document) -> Result<u64>;

    /// Delete every matching document; returns deleted count
    async fn delete_many(&self, filter: Document) -> Result<u64>;
}

/// Typed collection bundle the engine operates against
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn Collection<UserDoc>>,
    pub decks: Arc<dyn Collection<DeckDoc>>,
    pub cards: Arc<dyn Collection<CardDoc>>,
    pub categories: Arc<dyn Collection<CategoryDoc>>,
    pub tokens: Arc<dyn Collection<RefreshTokenDoc>>,
}

impl Store {
    /// Build a MongoDB-backed store, creating collections and indexes
    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: Arc::new(client.collection::<UserDoc>(USER_COLLECTION).await?),
            decks: Arc::new(client.collection::<DeckDoc>(DECK_COLLECTION).await?),
            cards: Arc::new(client.collection::<CardDoc>(CARD_COLLECTION).await?),
            categories: Arc::new(client.collection::<CategoryDoc>(CATEGORY_COLLECTION).await?),
            tokens: Arc::new(
                client
                    .collection::<RefreshTokenDoc>(REFRESH_TOKEN_COLLECTION)
                    .await?,
            ),
        })
    }

    /// Build an in-memory store (tests, local tooling)
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryCollection::new()),
            decks: Arc::new(MemoryCollection::new()),
            cards: Arc::new(MemoryCollection::new()),
            categories: Arc::new(MemoryCollection::new()),
            tokens: Arc::new(MemoryCollection::new()),
        }
    }
}
