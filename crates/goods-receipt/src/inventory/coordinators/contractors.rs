use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

use super::{holder, matches_text, CoordinatorScope, Holder};
use crate::inventory::domain::Contractor;
use crate::inventory::gateway::InventoryGateway;

/// View state for the contractor list.
pub struct ContractorsCoordinator<G: ?Sized> {
    gateway: Arc<G>,
    contractors: Holder<Vec<Contractor>>,
    scope: CoordinatorScope,
}

impl<G> ContractorsCoordinator<G>
where
    G: InventoryGateway + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        let contractors = holder(Vec::new());
        let mut scope = CoordinatorScope::new("contractors");

        let source = gateway.clone();
        scope.follow(
            async move { source.fetch_contractors().await },
            contractors.clone(),
            |list| list,
        );

        Self {
            gateway,
            contractors,
            scope,
        }
    }

    pub fn contractors(&self) -> Vec<Contractor> {
        self.contractors.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Contractor>> {
        self.contractors.subscribe()
    }

    /// Contractors whose name or symbol contains `text`, ignoring case.
    pub fn search(&self, text: &str) -> Vec<Contractor> {
        self.contractors
            .borrow()
            .iter()
            .filter(|contractor| {
                matches_text(&contractor.name, text) || matches_text(&contractor.symbol, text)
            })
            .cloned()
            .collect()
    }

    pub fn add_contractor(&self, name: &str, symbol: &str) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let (name, symbol) = (name.to_string(), symbol.to_string());
        self.scope.launch(async move {
            gateway.add_contractor(&name, &symbol).await;
        })
    }

    pub fn update_contractor(&self, uid: &str, name: &str, symbol: &str) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let (uid, name, symbol) = (uid.to_string(), name.to_string(), symbol.to_string());
        self.scope.launch(async move {
            if let Err(err) = gateway.update_contractor(&uid, &name, &symbol).await {
                error!(%uid, error = %err, "contractor update failed");
            }
        })
    }
}
