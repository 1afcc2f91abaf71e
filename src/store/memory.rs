//! An in-process document store, used in tests and for throwaway sessions.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::watch;

use crate::{
    Error,
    document::{Document, DocumentKey},
    store::DocumentStore,
};

#[derive(Debug)]
struct Collection {
    documents: BTreeMap<DocumentKey, Document>,
    revision: watch::Sender<u64>,
}

impl Collection {
    fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            revision: watch::Sender::new(0),
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

#[derive(Debug)]
struct State {
    collections: HashMap<String, Collection>,
    next_key: u64,
    online: bool,
}

impl State {
    fn collection(&mut self, name: &str) -> &mut Collection {
        self.collections
            .entry(name.to_owned())
            .or_insert_with(Collection::new)
    }

    fn check_online(&self) -> Result<(), Error> {
        if self.online {
            Ok(())
        } else {
            Err(Error::StoreUnavailable(
                "the in-memory store is offline".to_owned(),
            ))
        }
    }
}

/// Keeps documents in memory.
///
/// The store can be switched offline with
/// [MemoryDocumentStore::set_online], after which every read and write fails
/// with [Error::StoreUnavailable].
#[derive(Debug)]
pub struct MemoryDocumentStore {
    state: Mutex<State>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Create an empty store that is online.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                collections: HashMap::new(),
                next_key: 1,
                online: true,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, Error> {
        self.state.lock().map_err(|_| Error::DatabaseLockError)
    }

    /// Switch the store on or off.
    ///
    /// Coming back online bumps the revision of every collection so that
    /// watchers re-read.
    pub fn set_online(&self, online: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let was_online = state.online;
        state.online = online;

        if online && !was_online {
            state.collections.values().for_each(Collection::bump);
        }

        tracing::debug!("in-memory store is now {}", if online { "online" } else { "offline" });
    }

    /// Whether the store is online.
    pub fn is_online(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .online
    }

    /// Put `document` under a caller chosen `key`, skipping all checks.
    ///
    /// This is how tests plant documents that other writers could have left
    /// behind, such as ones with missing or mistyped fields.
    pub fn insert_raw(&self, collection: &str, key: &str, document: Document) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let collection = state.collection(collection);
        collection.documents.insert(key.to_owned(), document);
        collection.bump();
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, collection: &str, document: Document) -> Result<DocumentKey, Error> {
        let mut state = self.lock()?;
        state.check_online()?;

        let key = state.next_key.to_string();
        state.next_key += 1;

        let collection = state.collection(collection);
        collection.documents.insert(key.clone(), document);
        collection.bump();

        Ok(key)
    }

    fn replace(&self, collection: &str, key: &str, document: Document) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.check_online()?;

        let collection = state.collection(collection);
        let existing = collection.documents.get_mut(key).ok_or(Error::NotFound)?;
        *existing = document;
        collection.bump();

        Ok(())
    }

    fn remove(&self, collection: &str, key: &str) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.check_online()?;

        let collection = state.collection(collection);
        if collection.documents.remove(key).is_some() {
            collection.bump();
        }

        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, Error> {
        let state = self.lock()?;
        state.check_online()?;

        Ok(state
            .collections
            .get(collection)
            .and_then(|collection| collection.documents.get(key))
            .cloned())
    }

    fn list(&self, collection: &str) -> Result<Vec<(DocumentKey, Document)>, Error> {
        let state = self.lock()?;
        state.check_online()?;

        Ok(state
            .collections
            .get(collection)
            .map(|collection| {
                collection
                    .documents
                    .iter()
                    .map(|(key, document)| (key.clone(), document.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn watch(&self, collection: &str) -> watch::Receiver<u64> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .collection(collection)
            .revision
            .subscribe()
    }
}
