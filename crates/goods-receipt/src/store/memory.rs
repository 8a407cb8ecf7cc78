use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;
use uuid::Uuid;

use super::{
    Collection, CollectionEvent, DocumentEvent, DocumentStore, Listener, ListenerRegistration,
    Record, StoreError, StoredRecord,
};

/// In-process document store with snapshot listeners.
///
/// Writes notify listeners while the state lock is held, so each listener
/// observes changes in the order the store applied them.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    released: AtomicUsize,
}

#[derive(Default)]
struct State {
    collections: HashMap<Collection, BTreeMap<String, Record>>,
    collection_listeners: BTreeMap<u64, CollectionListener>,
    document_listeners: BTreeMap<u64, DocumentListener>,
    next_listener: u64,
    unavailable: bool,
}

struct CollectionListener {
    collection: Collection,
    sender: UnboundedSender<CollectionEvent>,
}

struct DocumentListener {
    collection: Collection,
    id: String,
    sender: UnboundedSender<DocumentEvent>,
}

#[derive(Clone, Copy)]
enum ListenerKind {
    Collection,
    Document,
}

impl State {
    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn snapshot(&self, collection: Collection) -> Vec<StoredRecord> {
        self.collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, fields)| StoredRecord {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record(&self, collection: Collection, id: &str) -> Option<Record> {
        self.collections
            .get(&collection)
            .and_then(|records| records.get(id))
            .cloned()
    }

    fn notify(&self, collection: Collection, id: &str) {
        let mut snapshot = None;
        for listener in self.collection_listeners.values() {
            if listener.collection == collection {
                let records = snapshot.get_or_insert_with(|| self.snapshot(collection));
                let _ = listener.sender.send(Ok(records.clone()));
            }
        }

        for listener in self.document_listeners.values() {
            if listener.collection == collection && listener.id == id {
                let _ = listener.sender.send(Ok(self.record(collection, id)));
            }
        }
    }

    fn register_id(&mut self) -> u64 {
        let id = self.next_listener;
        self.next_listener += 1;
        id
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, kind: ListenerKind, listener_id: u64) {
        let mut state = self.state();
        let removed = match kind {
            ListenerKind::Collection => state.collection_listeners.remove(&listener_id).is_some(),
            ListenerKind::Document => state.document_listeners.remove(&listener_id).is_some(),
        };
        self.released.fetch_add(1, Ordering::SeqCst);
        debug!(listener_id, removed, "memory store listener released");
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.state().unavailable = unavailable;
    }

    /// Terminate every active listener with an error and detach it.
    pub fn fail_listeners(&self, message: &str) {
        let mut state = self.inner.state();
        for (_, listener) in std::mem::take(&mut state.collection_listeners) {
            let _ = listener
                .sender
                .send(Err(StoreError::ListenerClosed(message.to_string())));
        }
        for (_, listener) in std::mem::take(&mut state.document_listeners) {
            let _ = listener
                .sender
                .send(Err(StoreError::ListenerClosed(message.to_string())));
        }
    }

    /// Listeners currently attached on the store side.
    pub fn active_listeners(&self) -> usize {
        let state = self.inner.state();
        state.collection_listeners.len() + state.document_listeners.len()
    }

    /// Registrations released so far.
    pub fn released_listeners(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    fn registration(&self, kind: ListenerKind, listener_id: u64) -> ListenerRegistration {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.release(kind, listener_id);
            }
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        record: Record,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.state();
        state.ensure_available()?;
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), record);
        state.notify(collection, id);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, StoreError> {
        let state = self.inner.state();
        state.ensure_available()?;
        Ok(state.record(collection, id))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError> {
        let state = self.inner.state();
        state.ensure_available()?;
        Ok(state.snapshot(collection))
    }

    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let state = self.inner.state();
        state.ensure_available()?;
        Ok(state
            .snapshot(collection)
            .into_iter()
            .filter(|record| record.fields.get(field) == Some(value))
            .collect())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Record,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.state();
        state.ensure_available()?;
        let record = state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        for (field, value) in fields {
            record.insert(field, value);
        }
        state.notify(collection, id);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut state = self.inner.state();
        state.ensure_available()?;
        let removed = state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.remove(id))
            .is_some();
        if removed {
            state.notify(collection, id);
        }
        Ok(())
    }

    fn listen_collection(&self, collection: Collection) -> Listener<CollectionEvent> {
        let (sender, events) = mpsc::unbounded_channel();
        let mut state = self.inner.state();
        let initial = state.ensure_available().map(|()| state.snapshot(collection));
        let failed = initial.is_err();
        let _ = sender.send(initial);

        if failed {
            return Listener {
                events,
                registration: ListenerRegistration::detached(),
            };
        }

        let listener_id = state.register_id();
        state
            .collection_listeners
            .insert(listener_id, CollectionListener { collection, sender });
        drop(state);

        Listener {
            events,
            registration: self.registration(ListenerKind::Collection, listener_id),
        }
    }

    fn listen_document(&self, collection: Collection, id: &str) -> Listener<DocumentEvent> {
        let (sender, events) = mpsc::unbounded_channel();
        let mut state = self.inner.state();
        let initial = state
            .ensure_available()
            .map(|()| state.record(collection, id));
        let failed = initial.is_err();
        let _ = sender.send(initial);

        if failed {
            return Listener {
                events,
                registration: ListenerRegistration::detached(),
            };
        }

        let listener_id = state.register_id();
        state.document_listeners.insert(
            listener_id,
            DocumentListener {
                collection,
                id: id.to_string(),
                sender,
            },
        );
        drop(state);

        Listener {
            events,
            registration: self.registration(ListenerKind::Document, listener_id),
        }
    }
}
