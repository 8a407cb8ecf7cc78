use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::inventory::domain::Item;
use crate::inventory::gateway::{InventoryGateway, StoreGateway};
use crate::store::memory::MemoryStore;
use crate::store::{
    Collection, CollectionEvent, DocumentEvent, DocumentStore, Listener, Record, StoreError,
    StoredRecord,
};

pub(super) type MemoryGateway = StoreGateway<MemoryStore>;

pub(super) fn memory_gateway() -> (MemoryStore, Arc<MemoryGateway>) {
    let store = MemoryStore::new();
    let gateway = Arc::new(StoreGateway::new(Arc::new(store.clone())));
    (store, gateway)
}

pub(super) fn receipt_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 14).expect("valid date")
}

pub(super) fn screws() -> Item {
    Item::new("Wkręty 4x40", "szt", "200")
}

pub(super) fn cement() -> Item {
    Item::new("Cement", "kg", "25")
}

/// Store a document carrying `number` directly, bypassing numbering.
pub(super) async fn seed_document(
    gateway: &MemoryGateway,
    uid: &str,
    number: Option<&str>,
    contractor_uid: &str,
) {
    let document = crate::inventory::domain::Document {
        date: Some("14/03/2024".to_string()),
        number: number.map(str::to_string),
        contractor_uid: Some(contractor_uid.to_string()),
        items: vec![screws()],
        uid: Some(uid.to_string()),
        contractor: None,
    };
    gateway.add_document(document, uid).await;
}

/// Add a contractor and return the uid the store assigned.
pub(super) async fn seed_contractor(gateway: &MemoryGateway, name: &str, symbol: &str) -> String {
    gateway.add_contractor(name, symbol).await;
    let contractors = gateway
        .fetch_contractors()
        .await
        .first()
        .await
        .expect("contractors emit");
    contractors
        .into_iter()
        .find(|contractor| contractor.name == name)
        .and_then(|contractor| contractor.uid)
        .expect("contractor stored with a uid")
}

/// Poll `condition` until it holds or a second has passed.
pub(super) async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within a second");
}

pub(super) async fn settle<F: Future>(handle: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("task finished in time")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("json body")
}

/// Memory store whose contractor lookups fail while everything else works.
#[derive(Clone, Default)]
pub(super) struct ContractorLookupFails {
    pub(super) inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for ContractorLookupFails {
    fn generate_id(&self) -> String {
        self.inner.generate_id()
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        record: Record,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, record).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, StoreError> {
        if collection == Collection::Contractors {
            return Err(StoreError::Unavailable("contractor lookup refused".to_string()));
        }
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StoreError> {
        self.inner.list(collection).await
    }

    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        self.inner.query_eq(collection, field, value).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Record,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    fn listen_collection(&self, collection: Collection) -> Listener<CollectionEvent> {
        self.inner.listen_collection(collection)
    }

    fn listen_document(&self, collection: Collection, id: &str) -> Listener<DocumentEvent> {
        self.inner.listen_document(collection, id)
    }
}
