//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, roles, errors)
//! - `billing` - Transactions, entitlements, reconciliation and access decisions

pub mod billing;
pub mod foundation;
