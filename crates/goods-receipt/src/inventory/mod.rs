//! Contractors, the item catalog and PZ goods-received documents.
//!
//! The [`gateway`] is the only module that talks to the store. Coordinators
//! and the HTTP router sit on top of the [`InventoryGateway`] trait so they
//! can be exercised against any backend.

pub mod coordinators;
pub mod domain;
pub mod gateway;
pub mod numbering;
pub mod router;

#[cfg(test)]
mod tests;

pub use coordinators::{
    AddDocumentCoordinator, ContractorsCoordinator, CoordinatorScope, DocumentsCoordinator,
    EditDocumentCoordinator,
};
pub use domain::{
    Contractor, Document, DocumentView, Item, LineItemError, LineItems, DEFAULT_UNIT_OPTIONS,
};
pub use gateway::{
    create_pz_document, following_sequence, GatewayError, InventoryGateway, StoreGateway,
};
pub use numbering::{pz_sequence, pz_sort_key, sort_by_number};
pub use router::inventory_router;
