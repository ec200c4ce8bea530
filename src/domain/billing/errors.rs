//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InvalidRequest | 400 |
//! | Conflict | 409 |
//! | UnknownSession | 404 |
//! | InvalidSignature | 400 |
//! | Gateway | 502 |
//! | NoEntitlement | 403 |
//! | Forbidden | 403 |
//! | NotFound | 404 |
//! | Storage | 500 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{CheckoutSessionId, ContentId, DomainError, ErrorCode};

/// Errors surfaced by checkout, reconciliation, and access operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// A precondition on the request failed (e.g. checkout of a free item).
    InvalidRequest { reason: String },

    /// The request collides with existing state (e.g. already subscribed).
    Conflict { reason: String },

    /// No transaction exists for this checkout session.
    UnknownSession(CheckoutSessionId),

    /// Webhook payload failed signature verification.
    InvalidSignature { reason: String },

    /// Payment gateway call failed or timed out.
    Gateway { message: String, retryable: bool },

    /// Caller has no purchase, subscription, or free rule covering the item.
    NoEntitlement(ContentId),

    /// Caller lacks the role for this operation.
    Forbidden { reason: String },

    /// Referenced resource does not exist.
    NotFound { resource: &'static str, id: String },

    /// Content file could not be read.
    Storage(String),

    /// Store failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        BillingError::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        BillingError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn unknown_session(session_id: CheckoutSessionId) -> Self {
        BillingError::UnknownSession(session_id)
    }

    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        BillingError::InvalidSignature {
            reason: reason.into(),
        }
    }

    pub fn gateway(message: impl Into<String>, retryable: bool) -> Self {
        BillingError::Gateway {
            message: message.into(),
            retryable,
        }
    }

    pub fn no_entitlement(content_id: ContentId) -> Self {
        BillingError::NoEntitlement(content_id)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        BillingError::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BillingError::Storage(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            BillingError::Conflict { .. } => ErrorCode::SubscriptionActive,
            BillingError::UnknownSession(_) => ErrorCode::UnknownSession,
            BillingError::InvalidSignature { .. } => ErrorCode::InvalidWebhookSignature,
            BillingError::Gateway { .. } => ErrorCode::GatewayError,
            BillingError::NoEntitlement(_) => ErrorCode::NoEntitlement,
            BillingError::Forbidden { .. } => ErrorCode::Forbidden,
            BillingError::NotFound { resource, .. } => match *resource {
                "subscription" => ErrorCode::SubscriptionNotFound,
                _ => ErrorCode::ContentNotFound,
            },
            BillingError::Storage(_) => ErrorCode::StorageError,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::InvalidRequest { reason } => reason.clone(),
            BillingError::Conflict { reason } => reason.clone(),
            BillingError::UnknownSession(id) => format!("Checkout session not found: {}", id),
            BillingError::InvalidSignature { reason } => {
                format!("Invalid webhook signature: {}", reason)
            }
            BillingError::Gateway { message, .. } => format!("Payment gateway error: {}", message),
            BillingError::NoEntitlement(id) => {
                format!("You don't have access to content {}", id)
            }
            BillingError::Forbidden { reason } => reason.clone(),
            BillingError::NotFound { resource, id } => format!("{} not found: {}", resource, id),
            BillingError::Storage(msg) => format!("Storage error: {}", msg),
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway { retryable, .. } => *retryable,
            BillingError::Storage(_) | BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidRequest => {
                BillingError::invalid_request(err.message)
            }
            ErrorCode::SubscriptionActive => BillingError::conflict(err.message),
            ErrorCode::ContentNotFound => BillingError::NotFound {
                resource: "content",
                id: err.details.get("id").cloned().unwrap_or_default(),
            },
            ErrorCode::SubscriptionNotFound => BillingError::NotFound {
                resource: "subscription",
                id: err.details.get("id").cloned().unwrap_or_default(),
            },
            ErrorCode::Forbidden | ErrorCode::Unauthorized => BillingError::forbidden(err.message),
            _ => BillingError::infrastructure(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_subscription_active_code() {
        let err = BillingError::conflict("Already subscribed");
        assert_eq!(err.code(), ErrorCode::SubscriptionActive);
        assert_eq!(err.to_string(), "Already subscribed");
    }

    #[test]
    fn unknown_session_names_session() {
        let err = BillingError::unknown_session(CheckoutSessionId::new("cs_x").unwrap());
        assert_eq!(err.code(), ErrorCode::UnknownSession);
        assert!(err.message().contains("cs_x"));
    }

    #[test]
    fn gateway_retryability_is_carried() {
        assert!(BillingError::gateway("timeout", true).is_retryable());
        assert!(!BillingError::gateway("card declined", false).is_retryable());
        assert!(!BillingError::invalid_request("free").is_retryable());
    }

    #[test]
    fn domain_database_errors_become_infrastructure() {
        let err: BillingError = DomainError::database("connection reset").into();
        assert_eq!(err, BillingError::Infrastructure("connection reset".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn storage_failures_have_their_own_code() {
        let err = BillingError::storage("permission denied");
        assert_eq!(err.code(), ErrorCode::StorageError);
        assert_eq!(err.code().to_string(), "STORAGE_ERROR");
        assert!(err.is_retryable());
    }

    #[test]
    fn domain_validation_errors_become_invalid_request() {
        let err: BillingError = DomainError::validation("currency", "bad currency").into();
        assert!(matches!(err, BillingError::InvalidRequest { .. }));
    }

    #[test]
    fn subscription_not_found_has_its_own_code() {
        let err = BillingError::not_found("subscription", "user_1");
        assert_eq!(err.code(), ErrorCode::SubscriptionNotFound);
        assert_eq!(err.message(), "subscription not found: user_1");
    }
}
