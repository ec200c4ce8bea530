//! HandlePaymentWebhookHandler - Command handler for gateway webhooks.
//!
//! Deliveries are at-least-once and may race the client's poll; both go
//! through the same reconciler, so replays are harmless.

use std::sync::Arc;

use crate::domain::billing::{BillingError, ObservationSource, PaymentStatus, ReconcileOutcome};
use crate::domain::foundation::CheckoutSessionId;
use crate::ports::{GatewayEvent, PaymentGateway};

use super::{ApplyObservedStatusCommand, ApplyObservedStatusHandler};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header (empty if absent).
    pub signature: String,
}

/// What became of a verified webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Observation reconciled against a known transaction.
    Reconciled {
        session_id: CheckoutSessionId,
        payment_status: PaymentStatus,
        amount_total: Option<i64>,
        outcome: ReconcileOutcome,
    },
    /// No transaction for the session. Acknowledged so the gateway stops retrying.
    UnknownSession { session_id: CheckoutSessionId },
    /// Event type this service does not act on.
    Ignored { event_type: String },
}

pub struct HandlePaymentWebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    reconciler: ApplyObservedStatusHandler,
}

impl HandlePaymentWebhookHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, reconciler: ApplyObservedStatusHandler) -> Self {
        Self {
            gateway,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<WebhookDisposition, BillingError> {
        // 1. Verify before anything in the body is trusted
        let event = self
            .gateway
            .verify_and_parse_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected payment webhook");
                BillingError::from(e)
            })?;

        let observation = match event {
            GatewayEvent::PaymentObserved(observation) => observation,
            GatewayEvent::Ignored {
                event_id,
                event_type,
            } => {
                tracing::debug!(event_id = %event_id, event_type = %event_type, "Webhook ignored");
                return Ok(WebhookDisposition::Ignored { event_type });
            }
        };

        // 2. Reconcile
        let applied = self
            .reconciler
            .handle(ApplyObservedStatusCommand {
                session_id: observation.session_id.clone(),
                observed: observation.payment_status,
                observed_amount: observation.amount_total,
                source: ObservationSource::Webhook,
            })
            .await;

        match applied {
            Ok(applied) => Ok(WebhookDisposition::Reconciled {
                session_id: observation.session_id,
                payment_status: applied.transaction.payment_status,
                amount_total: observation.amount_total,
                outcome: applied.outcome,
            }),
            Err(BillingError::UnknownSession(session_id)) => {
                tracing::warn!(
                    session_id = %session_id,
                    event_id = %observation.event_id,
                    "Webhook for unknown checkout session"
                );
                Ok(WebhookDisposition::UnknownSession { session_id })
            }
            Err(e) => Err(e),
        }
    }
}
