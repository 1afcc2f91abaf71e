//! Document storage and the user scoped repository built on top of it.
//!
//! A [DocumentStore] knows nothing about categories, expenses or budgets. It
//! holds JSON documents in named collections and tells watchers when a
//! collection changes. The [Repository] maps entities onto those collections
//! and turns change notifications into live snapshot streams.

mod memory;
mod repository;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use repository::Repository;
pub use sqlite::SqliteDocumentStore;

use tokio::sync::watch;

use crate::{
    Error,
    document::{Document, DocumentKey},
};

/// Storage for JSON documents grouped into collections.
pub trait DocumentStore: Send + Sync {
    /// Add `document` to `collection` and return the key the store assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    fn insert(&self, collection: &str, document: Document) -> Result<DocumentKey, Error>;

    /// Overwrite the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no document under `key`, or
    /// another error if the store cannot be reached or the write fails.
    fn replace(&self, collection: &str, key: &str, document: Document) -> Result<(), Error>;

    /// Remove the document stored under `key`. Removing a missing key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the write fails.
    fn remove(&self, collection: &str, key: &str) -> Result<(), Error>;

    /// Read the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the read fails.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, Error>;

    /// Read every document in `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the read fails.
    fn list(&self, collection: &str) -> Result<Vec<(DocumentKey, Document)>, Error>;

    /// Watch `collection` for changes.
    ///
    /// The value is a revision counter that increases after every committed
    /// change. Watching works even while the store cannot be reached, and the
    /// revision is bumped once it can be reached again.
    fn watch(&self, collection: &str) -> watch::Receiver<u64>;
}
