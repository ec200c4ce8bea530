//! In-memory adapters for testing and single-process development.

mod content_catalog;
mod entitlement_store;

pub use content_catalog::InMemoryContentCatalog;
pub use entitlement_store::InMemoryEntitlementStore;
