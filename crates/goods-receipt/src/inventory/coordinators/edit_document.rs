use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{holder, CoordinatorScope, Holder};
use crate::inventory::domain::{Contractor, Document, Item, LineItems};
use crate::inventory::gateway::InventoryGateway;

/// View state for editing one stored document and its contractor.
pub struct EditDocumentCoordinator<G: ?Sized> {
    gateway: Arc<G>,
    uid: String,
    document: Holder<Option<Document>>,
    contractor: Holder<Option<Contractor>>,
    scope: CoordinatorScope,
}

impl<G> EditDocumentCoordinator<G>
where
    G: InventoryGateway + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>, uid: &str, contractor_uid: &str) -> Self {
        let document = holder(None);
        let contractor = holder(None);
        let mut scope = CoordinatorScope::new("edit_document");

        let source = gateway.clone();
        let document_uid = uid.to_string();
        scope.follow(
            async move { source.fetch_document(&document_uid).await },
            document.clone(),
            |value| value,
        );

        let source = gateway.clone();
        let contractor_uid = contractor_uid.to_string();
        scope.follow(
            async move { source.fetch_contractor(&contractor_uid).await },
            contractor.clone(),
            |value| value,
        );

        Self {
            gateway,
            uid: uid.to_string(),
            document,
            contractor,
            scope,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn document(&self) -> Option<Document> {
        self.document.borrow().clone()
    }

    pub fn contractor(&self) -> Option<Contractor> {
        self.contractor.borrow().clone()
    }

    pub fn subscribe_document(&self) -> watch::Receiver<Option<Document>> {
        self.document.subscribe()
    }

    pub fn subscribe_contractor(&self) -> watch::Receiver<Option<Contractor>> {
        self.contractor.subscribe()
    }

    /// Editable copy of the current document lines.
    pub fn line_items(&self) -> LineItems {
        self.document
            .borrow()
            .as_ref()
            .map(|document| LineItems::from(document.items.clone()))
            .unwrap_or_default()
    }

    /// Write back whichever of contractor and lines were supplied.
    pub fn update_document(
        &self,
        contractor_uid: Option<String>,
        items: Option<Vec<Item>>,
    ) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let uid = self.uid.clone();
        self.scope.launch(async move {
            gateway
                .update_document(&uid, contractor_uid.as_deref(), items)
                .await;
        })
    }
}
