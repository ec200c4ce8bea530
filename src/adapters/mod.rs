//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process entitlement store and catalog
//! - `postgres` - sqlx-backed store, catalog and session validator
//! - `stripe` - Stripe Checkout gateway (plus a mock)
//! - `storage` - Content file storage
//! - `auth` - Session validators
//! - `http` - axum routes, DTOs and middleware

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod storage;
pub mod stripe;
