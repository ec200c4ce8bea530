//! GetPaymentStatusHandler - poll a checkout session and reconcile it.
//!
//! The client lands on the success page and polls this until the status
//! settles. Each poll asks the gateway and feeds the answer through the same
//! reconciler the webhook uses.

use std::sync::Arc;

use crate::domain::billing::{BillingError, ObservationSource, ReconcileOutcome, Transaction};
use crate::domain::foundation::{AuthenticatedUser, CheckoutSessionId};
use crate::ports::{PaymentGateway, SessionStatus, TransactionRepository};

use super::{ApplyObservedStatusCommand, ApplyObservedStatusHandler};

#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub user: AuthenticatedUser,
    pub session_id: CheckoutSessionId,
}

#[derive(Debug, Clone)]
pub struct GetPaymentStatusResult {
    /// What the gateway reported.
    pub session: SessionStatus,
    /// Local transaction after reconciliation.
    pub transaction: Transaction,
    pub outcome: ReconcileOutcome,
}

pub struct GetPaymentStatusHandler {
    transactions: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    reconciler: ApplyObservedStatusHandler,
}

impl GetPaymentStatusHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        reconciler: ApplyObservedStatusHandler,
    ) -> Self {
        Self {
            transactions,
            gateway,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatusQuery,
    ) -> Result<GetPaymentStatusResult, BillingError> {
        // Someone else's session looks exactly like a missing one
        let owned = self
            .transactions
            .find_by_session_id(&query.session_id)
            .await?
            .filter(|tx| tx.user_id == query.user.id);
        if owned.is_none() {
            return Err(BillingError::unknown_session(query.session_id));
        }

        let session = self.gateway.get_status(&query.session_id).await.map_err(|e| {
            tracing::error!(
                session_id = %query.session_id,
                error = %e,
                "Failed to fetch checkout session status"
            );
            BillingError::from(e)
        })?;

        let applied = self
            .reconciler
            .handle(ApplyObservedStatusCommand {
                session_id: query.session_id,
                observed: session.observed(),
                observed_amount: session.amount_total,
                source: ObservationSource::Poll,
            })
            .await?;

        Ok(GetPaymentStatusResult {
            session,
            transaction: applied.transaction,
            outcome: applied.outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{paid_item, user, Harness};
    use super::super::{CheckoutIntent, StartCheckoutCommand, StartCheckoutHandler};
    use super::*;
    use crate::domain::billing::PaymentStatus;
    use crate::ports::{GatewayError, PurchaseRepository};

    fn handler(harness: &Harness) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(
            Arc::new(harness.store.clone()),
            Arc::new(harness.gateway.clone()),
            harness.reconciler(),
        )
    }

    async fn checkout(harness: &Harness) -> CheckoutSessionId {
        harness.catalog.add_item(paid_item("pack_1", 499)).await;
        let checkout = StartCheckoutHandler::new(
            Arc::new(harness.catalog.clone()),
            Arc::new(harness.store.clone()),
            Arc::new(harness.store.clone()),
            Arc::new(harness.gateway.clone()),
            harness.policy.clone(),
        );
        checkout
            .handle(StartCheckoutCommand {
                user: user("buyer"),
                intent: CheckoutIntent::Purchase {
                    content_id: paid_item("pack_1", 499).id,
                },
                origin: "https://sounddrops.test".to_string(),
            })
            .await
            .unwrap()
            .session_id
    }

    fn query(session_id: &CheckoutSessionId) -> GetPaymentStatusQuery {
        GetPaymentStatusQuery {
            user: user("buyer"),
            session_id: session_id.clone(),
        }
    }

    #[tokio::test]
    async fn open_session_stays_pending() {
        let harness = Harness::new();
        let session_id = checkout(&harness).await;

        let result = handler(&harness).handle(query(&session_id)).await.unwrap();

        assert_eq!(result.transaction.payment_status, PaymentStatus::Pending);
        assert_eq!(result.session.payment_status, "unpaid");
        assert_eq!(result.outcome, ReconcileOutcome::Unchanged);
    }

    #[tokio::test]
    async fn paid_session_grants_purchase() {
        let harness = Harness::new();
        let session_id = checkout(&harness).await;
        harness.gateway.mark_paid(&session_id);

        let result = handler(&harness).handle(query(&session_id)).await.unwrap();

        assert_eq!(result.transaction.payment_status, PaymentStatus::Paid);
        assert_eq!(result.session.amount_total, Some(499));
        let purchases = PurchaseRepository::list_by_user(&harness.store, &user("buyer").id)
            .await
            .unwrap();
        assert_eq!(purchases.len(), 1);
    }

    #[tokio::test]
    async fn expired_session_settles_expired() {
        let harness = Harness::new();
        let session_id = checkout(&harness).await;
        harness.gateway.mark_expired(&session_id);

        let result = handler(&harness).handle(query(&session_id)).await.unwrap();

        assert_eq!(result.transaction.payment_status, PaymentStatus::Expired);
    }

    #[tokio::test]
    async fn unknown_session_is_not_polled() {
        let harness = Harness::new();
        let missing = CheckoutSessionId::new("cs_missing").unwrap();

        let err = handler(&harness).handle(query(&missing)).await.unwrap_err();

        assert_eq!(err, BillingError::unknown_session(missing));
        assert_eq!(harness.gateway.call_count("get_status"), 0);
    }

    #[tokio::test]
    async fn other_users_session_is_unknown() {
        let harness = Harness::new();
        let session_id = checkout(&harness).await;

        let err = handler(&harness)
            .handle(GetPaymentStatusQuery {
                user: user("someone_else"),
                session_id: session_id.clone(),
            })
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::unknown_session(session_id));
    }

    #[tokio::test]
    async fn gateway_timeout_is_retryable() {
        let harness = Harness::new();
        let session_id = checkout(&harness).await;
        harness
            .gateway
            .set_method_error("get_status", GatewayError::timeout("slow"));

        let err = handler(&harness).handle(query(&session_id)).await.unwrap_err();

        assert!(err.is_retryable());
        let stored = harness.store.find_by_session_id(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
    }
}
