//! HTTP DTOs for billing and content endpoints.
//!
//! These types define the JSON request/response structure of the API.
//! They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{GetPaymentStatusResult, WebhookDisposition};
use crate::domain::billing::{AccessDecision, CreatorEarnings, Purchase, Subscription};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to buy a single pack.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseCheckoutRequest {
    pub content_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Where to send the user to pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

/// Payment status after a poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    /// Gateway session status (`open`, `complete`, `expired`).
    pub status: String,
    /// Local payment status after reconciliation.
    pub payment_status: String,
    pub amount_total: Option<i64>,
}

impl From<GetPaymentStatusResult> for PaymentStatusResponse {
    fn from(result: GetPaymentStatusResult) -> Self {
        Self {
            status: result.session.status,
            payment_status: result.transaction.payment_status.as_str().to_string(),
            amount_total: result.session.amount_total,
        }
    }
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// `reconciled`, `unknown_session`, or `ignored`.
    pub status: String,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
}

impl From<WebhookDisposition> for WebhookResponse {
    fn from(disposition: WebhookDisposition) -> Self {
        match disposition {
            WebhookDisposition::Reconciled {
                payment_status,
                amount_total,
                ..
            } => Self {
                status: "reconciled".to_string(),
                payment_status: Some(payment_status.as_str().to_string()),
                amount_total,
            },
            WebhookDisposition::UnknownSession { .. } => Self {
                status: "unknown_session".to_string(),
                payment_status: None,
                amount_total: None,
            },
            WebhookDisposition::Ignored { .. } => Self {
                status: "ignored".to_string(),
                payment_status: None,
                amount_total: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub allowed: bool,
    pub reason: String,
}

impl From<AccessDecision> for AccessResponse {
    fn from(decision: AccessDecision) -> Self {
        Self {
            allowed: decision.is_allowed(),
            reason: decision.reason().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionView {
    pub id: String,
    pub status: String,
    /// ISO 8601
    pub created_at: String,
    /// ISO 8601
    pub expires_at: String,
}

impl From<Subscription> for SubscriptionView {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            status: sub.status.as_str().to_string(),
            created_at: sub.created_at.to_string(),
            expires_at: sub.expires_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub is_subscribed: bool,
    pub subscription: Option<SubscriptionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseView {
    pub id: String,
    pub content_id: String,
    pub amount_cents: i64,
    pub session_id: String,
    /// ISO 8601
    pub created_at: String,
}

impl From<Purchase> for PurchaseView {
    fn from(purchase: Purchase) -> Self {
        Self {
            id: purchase.id.to_string(),
            content_id: purchase.content_id.to_string(),
            amount_cents: purchase.amount_cents,
            session_id: purchase.session_id.to_string(),
            created_at: purchase.created_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseListResponse {
    pub purchases: Vec<PurchaseView>,
}

/// Creator sales summary. Money fields are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsResponse {
    pub total_packs: u64,
    pub total_sales: u64,
    pub total_downloads: u64,
    pub total_revenue: i64,
    pub creator_earnings: i64,
    pub platform_fee: i64,
}

impl From<CreatorEarnings> for EarningsResponse {
    fn from(e: CreatorEarnings) -> Self {
        Self {
            total_packs: e.total_packs,
            total_sales: e.total_sales,
            total_downloads: e.total_downloads,
            total_revenue: e.total_revenue_cents,
            creator_earnings: e.creator_earnings_cents,
            platform_fee: e.platform_fee_cents,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
