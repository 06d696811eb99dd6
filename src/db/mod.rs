//! Persistence layer
//!
//! The abstract port lives in [`store`]; [`mongo`] and [`memory`] are
//! its two implementations, and [`schemas`] holds the document types.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryCollection;
pub use mongo::{MongoClient, MongoCollection};
pub use store::{Collection, DocSchema, HasId, IntoIndexes, MutMetadata, Store};
