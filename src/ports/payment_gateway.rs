//! Payment gateway port.
//!
//! Contract for the remote service that hosts checkout pages and reports
//! payment outcomes (Stripe in production). The gateway's clock and delivery
//! guarantees are not trusted: callers treat every status it reports as an
//! observation to reconcile, never as a command.
//!
//! # Design
//!
//! - **Gateway agnostic**: No provider types leak through this interface
//! - **Bounded**: Implementations must time out rather than block
//! - **Verify before parse**: Webhook payloads are only decoded after the
//!   signature checks out

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingError, PaymentStatus};
use crate::domain::foundation::CheckoutSessionId;

/// Port for the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a one-off payment.
    ///
    /// Returns the gateway's session handle and the URL to redirect the
    /// customer to.
    async fn create_session(&self, request: CheckoutRequest)
        -> Result<CheckoutSession, GatewayError>;

    /// Fetch the current state of a checkout session.
    async fn get_status(&self, session_id: &CheckoutSessionId)
        -> Result<SessionStatus, GatewayError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Fails with `GatewayErrorCode::InvalidSignature` if the signature does
    /// not match or the timestamp is outside tolerance.
    async fn verify_and_parse_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<GatewayEvent, GatewayError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Amount in minor units.
    pub amount_cents: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Name shown on the hosted checkout page.
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Echoed back by the gateway on the session object.
    pub metadata: BTreeMap<String, String>,
}

/// Checkout session created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: CheckoutSessionId,
    pub redirect_url: String,
}

/// Gateway-reported state of a checkout session.
///
/// `status` and `payment_status` are the gateway's own vocabulary
/// (e.g. `open`/`complete`/`expired` and `paid`/`unpaid`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub status: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
}

impl SessionStatus {
    /// Maps the gateway vocabulary onto a local payment status.
    pub fn observed(&self) -> PaymentStatus {
        match (self.status.as_str(), self.payment_status.as_str()) {
            (_, "paid") | (_, "no_payment_required") => PaymentStatus::Paid,
            ("expired", _) => PaymentStatus::Expired,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Payment observation carried by a verified webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookObservation {
    pub event_id: String,
    pub session_id: CheckoutSessionId,
    pub payment_status: PaymentStatus,
    pub amount_total: Option<i64>,
}

/// Result of parsing a verified webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// The event reports a checkout session's payment status.
    PaymentObserved(WebhookObservation),

    /// Authentic event of a type this service does not act on.
    Ignored { event_id: String, event_type: String },
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Gateway's own error code, if it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidSignature, message)
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::MalformedPayload, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::InvalidSignature | GatewayErrorCode::MalformedPayload => {
                BillingError::invalid_signature(err.message)
            }
            _ => BillingError::gateway(err.message, err.retryable),
        }
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    NetworkError,
    Timeout,
    AuthenticationError,
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    InvalidSignature,
    MalformedPayload,
    ProviderError,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimitExceeded
                | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::InvalidSignature => "invalid_signature",
            GatewayErrorCode::MalformedPayload => "malformed_payload",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
