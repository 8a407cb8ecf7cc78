use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{holder, matches_text, CoordinatorScope, Holder};
use crate::inventory::domain::{Document, Item};
use crate::inventory::gateway::{create_pz_document, GatewayError, InventoryGateway};
use crate::inventory::numbering::pz_sequence;

/// View state for composing a new PZ document.
pub struct AddDocumentCoordinator<G: ?Sized> {
    gateway: Arc<G>,
    catalog: Holder<Vec<Item>>,
    next_number: Holder<i32>,
    unit_options: Vec<String>,
    scope: CoordinatorScope,
}

impl<G> AddDocumentCoordinator<G>
where
    G: InventoryGateway + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>, unit_options: Vec<String>) -> Self {
        let catalog = holder(Vec::new());
        let mut scope = CoordinatorScope::new("add_document");

        let source = gateway.clone();
        scope.follow(
            async move { source.fetch_items().await },
            catalog.clone(),
            |items| items,
        );

        Self {
            gateway,
            catalog,
            next_number: holder(1),
            unit_options,
            scope,
        }
    }

    pub fn catalog(&self) -> Vec<Item> {
        self.catalog.borrow().clone()
    }

    pub fn subscribe_catalog(&self) -> watch::Receiver<Vec<Item>> {
        self.catalog.subscribe()
    }

    /// Sequence assigned to the most recent document built here.
    pub fn next_number(&self) -> i32 {
        *self.next_number.borrow()
    }

    pub fn unit_options(&self) -> &[String] {
        &self.unit_options
    }

    pub fn search_items(&self, text: &str) -> Vec<Item> {
        self.catalog
            .borrow()
            .iter()
            .filter(|item| matches_text(&item.name, text))
            .cloned()
            .collect()
    }

    /// Offer a line item to the shared catalog.
    pub fn add_item(&self, name: &str, unit: &str, amount: &str) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let item = Item::new(name, unit, amount);
        self.scope.launch(async move {
            gateway.add_item(item).await;
        })
    }

    /// Number and store a new document dated today.
    pub fn add_document(
        &self,
        contractor_uid: &str,
        items: Vec<Item>,
    ) -> JoinHandle<Result<Document, GatewayError>> {
        self.add_document_dated(contractor_uid, items, Local::now().date_naive())
    }

    pub fn add_document_dated(
        &self,
        contractor_uid: &str,
        items: Vec<Item>,
        date: NaiveDate,
    ) -> JoinHandle<Result<Document, GatewayError>> {
        let gateway = self.gateway.clone();
        let next_number = self.next_number.clone();
        let uid = Uuid::new_v4().to_string();
        let contractor_uid = contractor_uid.to_string();
        self.scope.launch(async move {
            let document =
                create_pz_document(gateway.as_ref(), uid, &contractor_uid, &items, date).await?;
            if let Some(sequence) = document.number.as_deref().and_then(pz_sequence) {
                next_number.send_replace(sequence);
            }
            Ok(document)
        })
    }
}
