use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{holder, matches_text, CoordinatorScope, Holder};
use crate::inventory::domain::Document;
use crate::inventory::gateway::InventoryGateway;
use crate::inventory::numbering::sort_by_number;

/// View state for the document list, kept sorted by PZ sequence.
pub struct DocumentsCoordinator<G: ?Sized> {
    gateway: Arc<G>,
    documents: Holder<Vec<Document>>,
    scope: CoordinatorScope,
}

impl<G> DocumentsCoordinator<G>
where
    G: InventoryGateway + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        let documents = holder(Vec::new());
        let mut scope = CoordinatorScope::new("documents");

        let source = gateway.clone();
        scope.follow(
            async move { source.fetch_documents().await },
            documents.clone(),
            |mut list: Vec<Document>| {
                sort_by_number(&mut list);
                list
            },
        );

        Self {
            gateway,
            documents,
            scope,
        }
    }

    pub fn documents(&self) -> Vec<Document> {
        self.documents.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Document>> {
        self.documents.subscribe()
    }

    /// Documents whose number or contractor name contains `text`, ignoring case.
    pub fn search(&self, text: &str) -> Vec<Document> {
        self.documents
            .borrow()
            .iter()
            .filter(|document| {
                document
                    .number
                    .as_deref()
                    .is_some_and(|number| matches_text(number, text))
                    || document
                        .contractor
                        .as_ref()
                        .is_some_and(|contractor| matches_text(&contractor.name, text))
            })
            .cloned()
            .collect()
    }

    pub fn delete_document(&self, uid: &str) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let uid = uid.to_string();
        self.scope.launch(async move {
            gateway.delete_document(&uid).await;
        })
    }
}
