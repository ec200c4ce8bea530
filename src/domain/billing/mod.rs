//! Billing domain module.
//!
//! Checkout transactions, the entitlements they produce, and the pure rules
//! for reconciling payment status and deciding content access.
//!
//! # Module Structure
//!
//! - `payment_status` - PaymentStatus state machine (forward-only)
//! - `transaction` - Transaction aggregate keyed by checkout session
//! - `purchase` - Purchase entitlement
//! - `subscription` - Subscription entitlement, lazy expiry, grant planning
//! - `reconciliation` - Pure reconcile function and entitlement commands
//! - `content` - Catalog item view
//! - `access` - Access gate decision types
//! - `earnings` - Creator earnings aggregation

mod access;
mod content;
mod earnings;
mod errors;
mod payment_status;
mod purchase;
mod reconciliation;
mod subscription;
mod transaction;

pub use access::{AccessDecision, AccessGrant, AccessPurpose, DenyReason};
pub use content::{ContentItem, DownloadEvent, FileKind};
pub use earnings::{CreatorEarnings, PLATFORM_FEE_PERCENT};
pub use errors::BillingError;
pub use payment_status::PaymentStatus;
pub use purchase::Purchase;
pub use reconciliation::{
    reconcile, AmountMismatch, EntitlementCommand, ObservationSource, ReconcileOutcome,
    Reconciliation,
};
pub use subscription::{
    plan_subscription_grant, Subscription, SubscriptionGrant, SubscriptionStatus,
};
pub use transaction::{Transaction, TransactionKind};
