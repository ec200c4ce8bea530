//! Mock payment gateway for testing.
//!
//! Behaves like a tiny hosted-checkout service:
//! - `create_session` opens an unpaid session with a generated id
//! - `mark_paid` / `mark_expired` change what `get_status` reports
//! - Webhooks are JSON built by [`MockPaymentGateway::webhook_payload`]
//!
//! Supports error injection per method and call tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::PaymentStatus;
use crate::domain::foundation::CheckoutSessionId;
use crate::ports::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode, GatewayEvent,
    PaymentGateway, SessionStatus, WebhookObservation,
};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// let session = gateway.create_session(request).await?;
/// gateway.mark_paid(&session.session_id);
///
/// let payload = MockPaymentGateway::webhook_payload(&session.session_id, PaymentStatus::Paid, Some(499));
/// gateway.verify_and_parse_webhook(&payload, "t=1,v1=mock").await?;
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<String, SessionStatus>,
    next_id: u64,
    /// Errors returned by the named method until cleared.
    method_errors: HashMap<&'static str, GatewayError>,
    call_log: Vec<MethodCall>,
    checkout_requests: Vec<CheckoutRequest>,
    reject_webhooks: bool,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: &'static str,
    pub arg: String,
}

/// Wire format of mock webhook payloads.
#[derive(Debug, Serialize, Deserialize)]
struct MockWebhook {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    session_id: Option<String>,
    payment_status: Option<PaymentStatus>,
    amount_total: Option<i64>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails every webhook verification.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().reject_webhooks = true;
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Make `method` fail with `error` until [`Self::clear_errors`].
    pub fn set_method_error(&self, method: &'static str, error: GatewayError) {
        self.state().method_errors.insert(method, error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    /// Gateway now reports the session as complete and paid.
    pub fn mark_paid(&self, session_id: &CheckoutSessionId) {
        self.set_session(session_id, "complete", "paid");
    }

    /// Gateway now reports the session as expired and unpaid.
    pub fn mark_expired(&self, session_id: &CheckoutSessionId) {
        self.set_session(session_id, "expired", "unpaid");
    }

    /// Overrides the amount the gateway reports for a session.
    pub fn set_amount_total(&self, session_id: &CheckoutSessionId, amount: Option<i64>) {
        if let Some(session) = self.state().sessions.get_mut(session_id.as_str()) {
            session.amount_total = amount;
        }
    }

    fn set_session(&self, session_id: &CheckoutSessionId, status: &str, payment_status: &str) {
        let mut state = self.state();
        let entry = state
            .sessions
            .entry(session_id.as_str().to_string())
            .or_insert_with(|| SessionStatus {
                status: String::new(),
                payment_status: String::new(),
                amount_total: None,
            });
        entry.status = status.to_string();
        entry.payment_status = payment_status.to_string();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    /// Builds a webhook body reporting `status` for `session_id`.
    pub fn webhook_payload(
        session_id: &CheckoutSessionId,
        status: PaymentStatus,
        amount_total: Option<i64>,
    ) -> Vec<u8> {
        let event = MockWebhook {
            id: format!("evt_{}_{}", session_id, status),
            event_type: "checkout.session.completed".to_string(),
            session_id: Some(session_id.as_str().to_string()),
            payment_status: Some(status),
            amount_total,
        };
        serde_json::to_vec(&event).unwrap_or_default()
    }

    /// Builds a webhook body for an event type the service ignores.
    pub fn unrelated_webhook_payload(event_type: &str) -> Vec<u8> {
        let event = MockWebhook {
            id: "evt_unrelated".to_string(),
            event_type: event_type.to_string(),
            session_id: None,
            payment_status: None,
            amount_total: None,
        };
        serde_json::to_vec(&event).unwrap_or_default()
    }

    fn begin(&self, method: &'static str, arg: String) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.call_log.push(MethodCall { method, arg });
        match state.method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.begin("create_session", request.amount_cents.to_string())?;

        let mut state = self.state();
        state.next_id += 1;
        let id = format!("cs_mock_{}", state.next_id);
        state.sessions.insert(
            id.clone(),
            SessionStatus {
                status: "open".to_string(),
                payment_status: "unpaid".to_string(),
                amount_total: Some(request.amount_cents),
            },
        );
        state.checkout_requests.push(request);

        let session_id = CheckoutSessionId::new(id.clone())
            .map_err(|e| GatewayError::provider(e.to_string()))?;
        Ok(CheckoutSession {
            session_id,
            redirect_url: format!("https://checkout.mock/pay/{}", id),
        })
    }

    async fn get_status(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<SessionStatus, GatewayError> {
        self.begin("get_status", session_id.to_string())?;

        self.state()
            .sessions
            .get(session_id.as_str())
            .cloned()
            .ok_or_else(|| {
                GatewayError::new(
                    GatewayErrorCode::NotFound,
                    format!("No such checkout session: {}", session_id),
                )
            })
    }

    async fn verify_and_parse_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<GatewayEvent, GatewayError> {
        self.begin("verify_and_parse_webhook", signature_header.to_string())?;

        if self.state().reject_webhooks || signature_header.is_empty() {
            return Err(GatewayError::invalid_signature("Signature mismatch"));
        }

        let event: MockWebhook = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::malformed_payload(e.to_string()))?;

        match (event.session_id, event.payment_status) {
            (Some(session_id), Some(payment_status)) => {
                let session_id = CheckoutSessionId::new(session_id)
                    .map_err(|e| GatewayError::malformed_payload(e.to_string()))?;
                Ok(GatewayEvent::PaymentObserved(WebhookObservation {
                    event_id: event.id,
                    session_id,
                    payment_status,
                    amount_total: event.amount_total,
                }))
            }
            _ => Ok(GatewayEvent::Ignored {
                event_id: event.id,
                event_type: event.event_type,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(amount: i64) -> CheckoutRequest {
        CheckoutRequest {
            amount_cents: amount,
            currency: "usd".to_string(),
            product_name: "Pack".to_string(),
            success_url: "https://app/ok".to_string(),
            cancel_url: "https://app/cancel".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn created_session_starts_open_and_unpaid() {
        let gateway = MockPaymentGateway::new();
        let session = gateway.create_session(request(499)).await.unwrap();

        let status = gateway.get_status(&session.session_id).await.unwrap();
        assert_eq!(status.observed(), PaymentStatus::Pending);
        assert_eq!(status.amount_total, Some(499));
    }

    #[tokio::test]
    async fn mark_paid_changes_reported_status() {
        let gateway = MockPaymentGateway::new();
        let session = gateway.create_session(request(499)).await.unwrap();
        gateway.mark_paid(&session.session_id);

        let status = gateway.get_status(&session.session_id).await.unwrap();
        assert_eq!(status.observed(), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn method_error_is_injected() {
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("create_session", GatewayError::timeout("slow"));

        let err = gateway.create_session(request(499)).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Timeout);
        assert_eq!(gateway.call_count("create_session"), 1);
        assert!(gateway.checkout_requests().is_empty());
    }

    #[tokio::test]
    async fn webhook_payload_round_trips() {
        let gateway = MockPaymentGateway::new();
        let session_id = CheckoutSessionId::new("cs_1").unwrap();
        let payload = MockPaymentGateway::webhook_payload(&session_id, PaymentStatus::Paid, Some(5));

        match gateway.verify_and_parse_webhook(&payload, "sig").await.unwrap() {
            GatewayEvent::PaymentObserved(obs) => {
                assert_eq!(obs.session_id, session_id);
                assert_eq!(obs.payment_status, PaymentStatus::Paid);
                assert_eq!(obs.amount_total, Some(5));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let gateway = MockPaymentGateway::new();
        let payload = MockPaymentGateway::unrelated_webhook_payload("customer.created");

        let event = gateway.verify_and_parse_webhook(&payload, "sig").await.unwrap();
        assert!(matches!(event, GatewayEvent::Ignored { ref event_type, .. } if event_type == "customer.created"));
    }

    #[tokio::test]
    async fn rejecting_gateway_fails_verification() {
        let gateway = MockPaymentGateway::rejecting_webhooks();
        let payload = MockPaymentGateway::unrelated_webhook_payload("x");

        let err = gateway.verify_and_parse_webhook(&payload, "sig").await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidSignature);
    }
}
