//! HTTP adapter for checkout, subscription, purchase, and content endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState};
pub use routes::{billing_routes, webhook_routes};
