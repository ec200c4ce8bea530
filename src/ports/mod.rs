//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Entitlement Store
//!
//! - `TransactionRepository` - Checkout transactions + atomic reconciliation commit
//! - `PurchaseRepository` - Purchase reads
//! - `SubscriptionRepository` - Subscription reads and lifecycle writes
//!
//! ## External Collaborators
//!
//! - `PaymentGateway` - Hosted checkout, status lookup, webhook verification
//! - `ContentCatalog` / `DownloadLog` / `ContentStorage` - Catalog and delivery
//! - `SessionValidator` - Token to user + role

mod content_catalog;
mod content_storage;
mod download_log;
mod payment_gateway;
mod purchase_repository;
mod session_validator;
mod subscription_repository;
mod transaction_repository;

pub use content_catalog::ContentCatalog;
pub use content_storage::{ContentReader, ContentStorage, ContentStorageError, StoredContent};
pub use download_log::DownloadLog;
pub use payment_gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode, GatewayEvent,
    PaymentGateway, SessionStatus, WebhookObservation,
};
pub use purchase_repository::PurchaseRepository;
pub use session_validator::SessionValidator;
pub use subscription_repository::SubscriptionRepository;
pub use transaction_repository::{CommitResult, TransactionRepository};
