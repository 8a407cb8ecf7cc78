//! Document-collection store boundary.
//!
//! Everything the inventory gateway persists goes through [`DocumentStore`]: a
//! small set of per-collection operations modelled on hosted document
//! databases (records are JSON objects addressed by a string id). Change
//! notification is exposed as listeners that push full snapshots over a
//! channel until their [`ListenerRegistration`] is released.

pub mod live;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;

pub use live::LiveSequence;
pub use memory::MemoryStore;

/// Field map of a single stored record.
pub type Record = Map<String, Value>;

/// A record together with the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub fields: Record,
}

/// Logical collections used by the inventory gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Contractors,
    Items,
    Documents,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Contractors => "contractor",
            Collection::Items => "item",
            Collection::Documents => "document",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {id} not found in {collection}")]
    NotFound { collection: Collection, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("listener closed: {0}")]
    ListenerClosed(String),
}

/// Snapshot delivered by a collection listener.
pub type CollectionEvent = Result<Vec<StoredRecord>, StoreError>;

/// Snapshot delivered by a single-document listener.
pub type DocumentEvent = Result<Option<Record>, StoreError>;

/// Receiving half of a store listener plus the handle that detaches it.
pub struct Listener<E> {
    pub events: UnboundedReceiver<E>,
    pub registration: ListenerRegistration,
}

/// Storage abstraction so the gateway can run against any backend.
///
/// Implementations must be safe for concurrent use; the gateway adds no
/// synchronization of its own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fresh random identifier for a new record.
    fn generate_id(&self) -> String;

    async fn set(&self, collection: Collection, id: &str, record: Record)
        -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, StoreError>;

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError>;

    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Merge `fields` into an existing record, leaving other fields untouched.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Record,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Deliver the whole collection now and after every change to it.
    fn listen_collection(&self, collection: Collection) -> Listener<CollectionEvent>;

    /// Deliver one record (or its absence) now and after every change to it.
    fn listen_document(&self, collection: Collection, id: &str) -> Listener<DocumentEvent>;
}

/// Release handle for a store-side listener.
///
/// The release callback runs at most once, either through [`remove`] or when
/// the handle is dropped.
///
/// [`remove`]: ListenerRegistration::remove
pub struct ListenerRegistration {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerRegistration {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Registration with nothing to release.
    pub fn detached() -> Self {
        Self { release: None }
    }

    pub fn remove(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.is_active())
            .finish()
    }
}
