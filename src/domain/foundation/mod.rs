//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, auth context, the state machine trait and
//! the error types every other layer builds on.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, Role};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    CheckoutSessionId, ContentId, DownloadId, PurchaseId, SubscriptionId, TransactionId, UserId,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
