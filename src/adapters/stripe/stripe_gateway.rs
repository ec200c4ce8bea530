//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` against the Stripe Checkout API:
//! - `POST /v1/checkout/sessions` with inline `price_data` (no Stripe products)
//! - `GET /v1/checkout/sessions/{id}` for polling
//! - `Stripe-Signature` verification for webhooks
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp tolerance (default 5 minutes) against replayed deliveries
//! - Secrets held in `secrecy::SecretString`

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::billing::PaymentStatus;
use crate::domain::foundation::CheckoutSessionId;
use crate::ports::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode, GatewayEvent,
    PaymentGateway, SessionStatus, WebhookObservation,
};

use super::webhook_types::{
    SignatureHeader, StripeCheckoutSession, StripeErrorResponse, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Clock skew tolerance for future timestamps.
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    api_base_url: String,

    /// Upper bound on every outbound request.
    timeout: Duration,

    /// Maximum webhook age in seconds.
    tolerance_secs: i64,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base_url: "https://api.stripe.com".to_string(),
            timeout: Duration::from_secs(10),
            tolerance_secs: 300,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }
}

/// Stripe Checkout adapter.
pub struct StripePaymentGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Form parameters for a one-off payment session.
    fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        params
    }

    /// Verify a webhook signature against `now` (unix seconds).
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), GatewayError> {
        let age = now - header.timestamp;

        if age > self.config.tolerance_secs {
            tracing::warn!(
                event_timestamp = header.timestamp,
                age_secs = age,
                "Webhook event too old - possible replay"
            );
            return Err(GatewayError::invalid_signature(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from the future"
            );
            return Err(GatewayError::invalid_signature("Event timestamp in future"));
        }

        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
            .map_err(|e| GatewayError::provider(format!("Invalid webhook secret: {}", e)))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| expected.as_slice().ct_eq(candidate.as_slice()).unwrap_u8() == 1);

        if !matched {
            tracing::warn!("Invalid webhook signature");
            return Err(GatewayError::invalid_signature("Invalid signature"));
        }

        Ok(())
    }

    /// Convert a verified event into a gateway event.
    fn parse_event(payload: &[u8]) -> Result<GatewayEvent, GatewayError> {
        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            GatewayError::malformed_payload(format!("Invalid JSON: {}", e))
        })?;

        let observed = match event.event_type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => None,
            "checkout.session.async_payment_failed" => Some(PaymentStatus::Failed),
            "checkout.session.expired" => Some(PaymentStatus::Expired),
            _ => {
                return Ok(GatewayEvent::Ignored {
                    event_id: event.id,
                    event_type: event.event_type,
                })
            }
        };

        let session: StripeCheckoutSession = serde_json::from_value(event.data.object)
            .map_err(|e| {
                GatewayError::malformed_payload(format!("Invalid checkout session: {}", e))
            })?;

        let payment_status = observed.unwrap_or_else(|| {
            SessionStatus {
                status: session.status.clone().unwrap_or_default(),
                payment_status: session.payment_status.clone(),
                amount_total: session.amount_total,
            }
            .observed()
        });

        let session_id = CheckoutSessionId::new(session.id)
            .map_err(|e| GatewayError::malformed_payload(e.to_string()))?;

        Ok(GatewayEvent::PaymentObserved(WebhookObservation {
            event_id: event.id,
            session_id,
            payment_status,
            amount_total: session.amount_total,
        }))
    }

    /// Turn a non-2xx response into a gateway error.
    async fn error_from_response(operation: &str, response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<StripeErrorResponse>(&body).ok();

        let code = match status.as_u16() {
            400 => GatewayErrorCode::InvalidRequest,
            401 | 403 => GatewayErrorCode::AuthenticationError,
            404 => GatewayErrorCode::NotFound,
            429 => GatewayErrorCode::RateLimitExceeded,
            _ => GatewayErrorCode::ProviderError,
        };

        let message = parsed
            .as_ref()
            .and_then(|p| p.error.message.clone())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        tracing::error!(
            operation,
            status = status.as_u16(),
            error = %message,
            "Stripe request failed"
        );

        let error = GatewayError::new(code, format!("Stripe API error: {}", message));
        match parsed.and_then(|p| p.error.code) {
            Some(provider_code) => error.with_provider_code(provider_code),
            None => error,
        }
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout(e.to_string())
    } else {
        GatewayError::network(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = Self::checkout_form(&request);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("create_session", response).await);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        let redirect_url = session.url.clone().ok_or_else(|| {
            GatewayError::provider("Stripe response is missing the checkout url")
        })?;
        let session_id = CheckoutSessionId::new(session.id)
            .map_err(|e| GatewayError::provider(e.to_string()))?;

        tracing::info!(
            session_id = %session_id,
            amount_cents = request.amount_cents,
            "Created Stripe checkout session"
        );

        Ok(CheckoutSession {
            session_id,
            redirect_url,
        })
    }

    async fn get_status(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<SessionStatus, GatewayError> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("get_status", response).await);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(SessionStatus {
            status: session.status.unwrap_or_default(),
            payment_status: session.payment_status,
            amount_total: session.amount_total,
        })
    }

    async fn verify_and_parse_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<GatewayEvent, GatewayError> {
        let header = SignatureHeader::parse(signature_header).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            GatewayError::invalid_signature(e.to_string())
        })?;

        self.verify_signature(payload, &header, chrono::Utc::now().timestamp())?;

        let event = Self::parse_event(payload)?;
        if let GatewayEvent::Ignored { event_id, event_type } = &event {
            tracing::debug!(event_id = %event_id, event_type = %event_type, "Ignoring Stripe event");
        }
        Ok(event)
    }
}
