//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresEntitlementStore` - Transactions, purchases, subscriptions
//! - `PostgresContentCatalog` - Catalog reads and download accounting
//! - `PostgresSessionValidator` - `user_sessions` token lookup

mod content_catalog;
mod entitlement_store;
mod session_validator;

pub use content_catalog::PostgresContentCatalog;
pub use entitlement_store::PostgresEntitlementStore;
pub use session_validator::PostgresSessionValidator;
