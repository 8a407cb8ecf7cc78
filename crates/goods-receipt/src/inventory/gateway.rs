use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::domain::{Contractor, Document, Item};
use super::numbering::highest_sequence;
use crate::store::{
    Collection, CollectionEvent, DocumentEvent, DocumentStore, LiveSequence, Record, StoreError,
    StoredRecord,
};

/// Domain operations over contractors, the item catalog and PZ documents.
///
/// Writes other than [`update_contractor`] log failures instead of returning
/// them; callers cannot tell a failed write from a successful one.
///
/// [`update_contractor`]: InventoryGateway::update_contractor
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// Store a contractor unless one with the same name already exists.
    async fn add_contractor(&self, name: &str, symbol: &str);

    /// Overwrite `name` and `symbol` of an existing contractor.
    async fn update_contractor(&self, uid: &str, name: &str, symbol: &str)
        -> Result<(), GatewayError>;

    async fn fetch_contractors(&self) -> LiveSequence<Vec<Contractor>>;

    async fn fetch_contractor(&self, uid: &str) -> LiveSequence<Option<Contractor>>;

    /// Offer an item to the catalog unless one with the same name exists.
    async fn add_item(&self, item: Item);

    async fn fetch_items(&self) -> LiveSequence<Vec<Item>>;

    /// Highest PZ sequence in use, or `0`. Callers add one.
    async fn next_pz_number(&self) -> i32;

    async fn add_document(&self, document: Document, uid: &str);

    /// All documents, each joined with its contractor.
    async fn fetch_documents(&self) -> LiveSequence<Vec<Document>>;

    async fn fetch_document(&self, uid: &str) -> LiveSequence<Option<Document>>;

    /// Write only the supplied fields.
    async fn update_document(
        &self,
        uid: &str,
        contractor_uid: Option<&str>,
        items: Option<Vec<Item>>,
    );

    async fn delete_document(&self, uid: &str);
}

/// Error surfaced by the gateway operations that propagate failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("PZ sequence exhausted: {last} is already in use")]
    SequenceExhausted { last: i32 },
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Store(StoreError::NotFound { .. }))
    }
}

/// [`InventoryGateway`] backed by a [`DocumentStore`].
pub struct StoreGateway<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for StoreGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> StoreGateway<S>
where
    S: DocumentStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn try_add_contractor(&self, name: &str, symbol: &str) -> Result<bool, StoreError> {
        let existing = self
            .store
            .query_eq(Collection::Contractors, "name", &json!(name))
            .await?;
        if !existing.is_empty() {
            return Ok(false);
        }

        let uid = self.store.generate_id();
        let contractor = Contractor {
            name: name.to_string(),
            symbol: symbol.to_string(),
            uid: Some(uid.clone()),
        };
        self.store
            .set(Collection::Contractors, &uid, encode(&contractor)?)
            .await?;
        Ok(true)
    }

    async fn try_add_item(&self, item: &Item) -> Result<bool, StoreError> {
        let existing = self
            .store
            .query_eq(Collection::Items, "name", &json!(item.name))
            .await?;
        if !existing.is_empty() {
            return Ok(false);
        }

        let id = self.store.generate_id();
        self.store.set(Collection::Items, &id, encode(item)?).await?;
        Ok(true)
    }
}

#[async_trait]
impl<S> InventoryGateway for StoreGateway<S>
where
    S: DocumentStore + ?Sized + 'static,
{
    async fn add_contractor(&self, name: &str, symbol: &str) {
        match self.try_add_contractor(name, symbol).await {
            Ok(true) => debug!(name, symbol, "contractor added"),
            Ok(false) => debug!(name, "contractor already exists"),
            Err(err) => warn!(name, error = %err, "failed to add contractor"),
        }
    }

    async fn update_contractor(
        &self,
        uid: &str,
        name: &str,
        symbol: &str,
    ) -> Result<(), GatewayError> {
        let mut fields = Record::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("symbol".to_string(), json!(symbol));

        match self
            .store
            .update(Collection::Contractors, uid, fields)
            .await
        {
            Ok(()) => {
                debug!(uid, "contractor updated");
                Ok(())
            }
            Err(err) => {
                error!(uid, error = %err, "failed to update contractor");
                Err(err.into())
            }
        }
    }

    async fn fetch_contractors(&self) -> LiveSequence<Vec<Contractor>> {
        let listener = self.store.listen_collection(Collection::Contractors);
        LiveSequence::from_listener(listener, |event: CollectionEvent| {
            event.map(|records| decode_all(Collection::Contractors, records, adopt_contractor_id))
        })
    }

    async fn fetch_contractor(&self, uid: &str) -> LiveSequence<Option<Contractor>> {
        let listener = self.store.listen_document(Collection::Contractors, uid);
        let uid = uid.to_string();
        LiveSequence::from_listener(listener, move |event: DocumentEvent| {
            event?
                .map(|record| {
                    decode(record).map(|contractor| adopt_contractor_id(contractor, &uid))
                })
                .transpose()
        })
    }

    async fn add_item(&self, item: Item) {
        match self.try_add_item(&item).await {
            Ok(true) => debug!(name = %item.name, "item added to catalog"),
            Ok(false) => debug!(name = %item.name, "item already in catalog"),
            Err(err) => error!(name = %item.name, error = %err, "failed to add item"),
        }
    }

    async fn fetch_items(&self) -> LiveSequence<Vec<Item>> {
        let listener = self.store.listen_collection(Collection::Items);
        LiveSequence::from_listener(listener, |event: CollectionEvent| {
            event.map(|records| decode_all(Collection::Items, records, |item, _| item))
        })
    }

    async fn next_pz_number(&self) -> i32 {
        match self.store.list(Collection::Documents).await {
            Ok(records) => highest_sequence(
                records
                    .iter()
                    .filter_map(|record| record.fields.get("number").and_then(Value::as_str)),
            ),
            Err(err) => {
                error!(error = %err, "failed to read document numbers");
                0
            }
        }
    }

    async fn add_document(&self, document: Document, uid: &str) {
        let outcome = match encode(&document) {
            Ok(record) => self.store.set(Collection::Documents, uid, record).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => debug!(uid, number = ?document.number, "document added"),
            Err(err) => error!(uid, error = %err, "failed to add document"),
        }
    }

    async fn fetch_documents(&self) -> LiveSequence<Vec<Document>> {
        let store = self.store.clone();
        let listener = self.store.listen_collection(Collection::Documents);
        LiveSequence::from_listener_then(listener, move |event: CollectionEvent| {
            let store = store.clone();
            async move {
                let documents = decode_all(Collection::Documents, event?, adopt_document_id);
                Ok(join_contractors(&*store, documents).await)
            }
        })
    }

    async fn fetch_document(&self, uid: &str) -> LiveSequence<Option<Document>> {
        let listener = self.store.listen_document(Collection::Documents, uid);
        let uid = uid.to_string();
        LiveSequence::from_listener(listener, move |event: DocumentEvent| {
            event?
                .map(|record| {
                    decode(record).map(|document| adopt_document_id(document, &uid))
                })
                .transpose()
        })
    }

    async fn update_document(
        &self,
        uid: &str,
        contractor_uid: Option<&str>,
        items: Option<Vec<Item>>,
    ) {
        let mut fields = Record::new();
        if let Some(contractor_uid) = contractor_uid {
            fields.insert("contractorUid".to_string(), json!(contractor_uid));
        }
        if let Some(items) = items {
            match serde_json::to_value(items) {
                Ok(value) => {
                    fields.insert("item".to_string(), value);
                }
                Err(err) => {
                    error!(uid, error = %err, "failed to encode document items");
                    return;
                }
            }
        }

        if fields.is_empty() {
            debug!(uid, "document update carried no fields");
            return;
        }

        match self.store.update(Collection::Documents, uid, fields).await {
            Ok(()) => debug!(uid, "document updated"),
            Err(err) => error!(uid, error = %err, "failed to update document"),
        }
    }

    async fn delete_document(&self, uid: &str) {
        match self.store.delete(Collection::Documents, uid).await {
            Ok(()) => info!(uid, "document deleted"),
            Err(err) => warn!(uid, error = %err, "failed to delete document"),
        }
    }
}

/// Sequence a new document should take: one past the highest in use.
pub fn following_sequence(last: i32) -> Result<i32, GatewayError> {
    last.checked_add(1).ok_or(GatewayError::SequenceExhausted { last })
}

/// Assign the next PZ number and store a new document dated `date`.
///
/// Reads the highest sequence, adds one and writes; nothing reserves the
/// number in between. Refuses to write once the sequence cannot grow.
pub async fn create_pz_document<G>(
    gateway: &G,
    uid: String,
    contractor_uid: &str,
    items: &[Item],
    date: NaiveDate,
) -> Result<Document, GatewayError>
where
    G: InventoryGateway + ?Sized,
{
    let last = gateway.next_pz_number().await;
    let sequence = following_sequence(last).map_err(|err| {
        error!(%uid, last, "no PZ number left to assign");
        err
    })?;
    let document = Document::new_pz(uid.clone(), sequence, contractor_uid, items, date);
    gateway.add_document(document.clone(), &uid).await;
    Ok(document)
}

async fn join_contractors<S>(store: &S, mut documents: Vec<Document>) -> Vec<Document>
where
    S: DocumentStore + ?Sized,
{
    for document in &mut documents {
        let Some(contractor_uid) = document.contractor_uid.clone() else {
            continue;
        };
        match store.get(Collection::Contractors, &contractor_uid).await {
            Ok(Some(record)) => match decode::<Contractor>(record) {
                Ok(contractor) => document.contractor = Some(contractor),
                Err(err) => warn!(%contractor_uid, error = %err, "undecodable contractor record"),
            },
            Ok(None) => debug!(%contractor_uid, "document references a missing contractor"),
            Err(err) => error!(%contractor_uid, error = %err, "failed to fetch contractor data"),
        }
    }
    documents
}

fn adopt_contractor_id(mut contractor: Contractor, id: &str) -> Contractor {
    contractor.uid.get_or_insert_with(|| id.to_string());
    contractor
}

fn adopt_document_id(mut document: Document, id: &str) -> Document {
    document.uid.get_or_insert_with(|| id.to_string());
    document
}

fn decode<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Decode every record, skipping the ones that do not fit `T`.
fn decode_all<T, F>(collection: Collection, records: Vec<StoredRecord>, adopt: F) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(T, &str) -> T,
{
    records
        .into_iter()
        .filter_map(|StoredRecord { id, fields }| match decode::<T>(fields) {
            Ok(value) => Some(adopt(value, &id)),
            Err(err) => {
                warn!(%collection, id, error = %err, "skipping undecodable record");
                None
            }
        })
        .collect()
}

fn encode<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::Serialization(serde::ser::Error::custom(
            format!("expected an object, got {other}"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_rejects_non_objects() {
        assert!(matches!(
            encode(&"plain"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn decode_all_skips_bad_records_and_adopts_ids() {
        let mut good = Record::new();
        good.insert("name".to_string(), json!("Acme"));
        let mut bad = Record::new();
        bad.insert("name".to_string(), json!(42));

        let contractors = decode_all(
            Collection::Contractors,
            vec![
                StoredRecord {
                    id: "c-1".to_string(),
                    fields: good,
                },
                StoredRecord {
                    id: "c-2".to_string(),
                    fields: bad,
                },
            ],
            adopt_contractor_id,
        );

        assert_eq!(contractors.len(), 1);
        assert_eq!(contractors[0].uid.as_deref(), Some("c-1"));
    }
}
