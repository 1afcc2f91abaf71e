//! Implements a SQLite backed document store.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use rusqlite::{Connection, OptionalExtension, Row, named_params};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    Error,
    document::{Document, DocumentKey},
    store::DocumentStore,
};

#[derive(Debug)]
struct Inner {
    connection: Mutex<Connection>,
    watchers: Mutex<HashMap<String, watch::Sender<u64>>>,
}

impl Inner {
    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLockError)
    }

    fn watchers(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<u64>>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, collection: &str) {
        if let Some(sender) = self.watchers().get(collection) {
            sender.send_modify(|revision| *revision += 1);
        }
    }

    fn notify_all(&self) {
        for sender in self.watchers().values() {
            sender.send_modify(|revision| *revision += 1);
        }
    }

    fn data_version(&self) -> Result<i64, Error> {
        self.connection()?
            .query_row("PRAGMA data_version;", [], |row| row.get(0))
            .map_err(Error::from)
    }
}

/// Stores documents as JSON text in a SQLite database.
///
/// Writes made through this store notify watchers straight away. Writes made
/// by other connections, e.g. another process sharing the database file, are
/// only picked up once [SqliteDocumentStore::spawn_change_poller] is running.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    inner: Arc<Inner>,
}

impl SqliteDocumentStore {
    /// Wrap `connection`, creating the document table if it does not exist.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        create_table(&connection)?;

        Ok(Self {
            inner: Arc::new(Inner {
                connection: Mutex::new(connection),
                watchers: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// This function will return an error if the file cannot be opened or
    /// there is an SQL error.
    pub fn open(path: &Path) -> Result<Self, Error> {
        Self::new(Connection::open(path)?)
    }

    /// Create a store backed by a private in-memory database.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Poll the database every `poll_interval` for commits made by other
    /// connections and notify all watchers when one is seen.
    ///
    /// The poller stops by itself once every handle to the store is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn_change_poller(&self, poll_interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(&self.inner);

        tokio::spawn(poll_data_version(store, poll_interval))
    }
}

async fn poll_data_version(store: Weak<Inner>, poll_interval: Duration) {
    let mut ticker = tokio::time::interval(poll_interval);
    let mut last_version: Option<i64> = None;

    loop {
        ticker.tick().await;

        let Some(inner) = store.upgrade() else {
            tracing::debug!("document store dropped, stopping change poller");
            break;
        };

        match inner.data_version() {
            Ok(version) => {
                if last_version.is_some_and(|last| last != version) {
                    tracing::debug!("database changed by another connection");
                    inner.notify_all();
                }
                last_version = Some(version);
            }
            Err(error) => tracing::warn!("could not read the database data version: {error}"),
        }
    }
}

fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS document (
            id INTEGER PRIMARY KEY,
            collection TEXT NOT NULL,
            body TEXT NOT NULL
        );",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_document_collection ON document(collection);",
        (),
    )?;

    Ok(())
}

/// Keys are row ids. A key that is not a row id cannot match any row.
fn parse_key(key: &str) -> Option<i64> {
    key.parse().ok()
}

fn parse_body(collection: &str, key: &str, body: &str) -> Option<Document> {
    match serde_json::from_str(body) {
        Ok(document) => Some(document),
        Err(error) => {
            tracing::warn!("skipping unreadable document {key} in {collection}: {error}");
            None
        }
    }
}

fn map_row(row: &Row) -> Result<(i64, String), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?))
}

impl DocumentStore for SqliteDocumentStore {
    fn insert(&self, collection: &str, document: Document) -> Result<DocumentKey, Error> {
        let body = serde_json::to_string(&document)?;

        let key = {
            let connection = self.inner.connection()?;
            connection.execute(
                "INSERT INTO document (collection, body) VALUES (?1, ?2);",
                (collection, &body),
            )?;
            connection.last_insert_rowid().to_string()
        };

        self.inner.notify(collection);

        Ok(key)
    }

    fn replace(&self, collection: &str, key: &str, document: Document) -> Result<(), Error> {
        let id = parse_key(key).ok_or(Error::NotFound)?;
        let body = serde_json::to_string(&document)?;

        let rows_affected = self.inner.connection()?.execute(
            "UPDATE document SET body = ?1 WHERE id = ?2 AND collection = ?3;",
            (&body, id, collection),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        self.inner.notify(collection);

        Ok(())
    }

    fn remove(&self, collection: &str, key: &str) -> Result<(), Error> {
        let Some(id) = parse_key(key) else {
            return Ok(());
        };

        let rows_affected = self.inner.connection()?.execute(
            "DELETE FROM document WHERE id = ?1 AND collection = ?2;",
            (id, collection),
        )?;

        if rows_affected > 0 {
            self.inner.notify(collection);
        }

        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, Error> {
        let Some(id) = parse_key(key) else {
            return Ok(None);
        };

        let body: Option<String> = self
            .inner
            .connection()?
            .prepare("SELECT body FROM document WHERE id = :id AND collection = :collection;")?
            .query_row(named_params! { ":id": id, ":collection": collection }, |row| {
                row.get(0)
            })
            .optional()?;

        Ok(body.and_then(|body| parse_body(collection, key, &body)))
    }

    fn list(&self, collection: &str) -> Result<Vec<(DocumentKey, Document)>, Error> {
        let rows = self
            .inner
            .connection()?
            .prepare("SELECT id, body FROM document WHERE collection = :collection ORDER BY id;")?
            .query_map(named_params! { ":collection": collection }, map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, body)| {
                let key = id.to_string();
                parse_body(collection, &key, &body).map(|document| (key, document))
            })
            .collect())
    }

    fn watch(&self, collection: &str) -> watch::Receiver<u64> {
        self.inner
            .watchers()
            .entry(collection.to_owned())
            .or_insert_with(|| watch::Sender::new(0))
            .subscribe()
    }
}
