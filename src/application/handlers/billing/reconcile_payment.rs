//! ApplyObservedStatusHandler - the reconciler shared by poll and webhook.
//!
//! Folds one observed payment status into the stored transaction with the
//! pure [`reconcile`] function, then commits the result through the store's
//! compare-and-swap. If another observer committed first the commit comes back
//! `Stale` and the decision is recomputed from the fresh row, so a duplicate
//! or racing `paid` observation ends as a no-op instead of a second grant.

use std::sync::Arc;

use crate::domain::billing::{
    reconcile, BillingError, ObservationSource, PaymentStatus, ReconcileOutcome, Transaction,
};
use crate::domain::foundation::{CheckoutSessionId, DomainError, ErrorCode, Timestamp};
use crate::ports::{CommitResult, TransactionRepository};

/// Attempts before giving up on a session that keeps changing underneath us.
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// An observation of a checkout session's payment status.
#[derive(Debug, Clone)]
pub struct ApplyObservedStatusCommand {
    pub session_id: CheckoutSessionId,
    pub observed: PaymentStatus,
    /// Gateway-reported total, when it sent one.
    pub observed_amount: Option<i64>,
    pub source: ObservationSource,
}

#[derive(Debug, Clone)]
pub struct ApplyObservedStatusResult {
    /// Transaction as committed.
    pub transaction: Transaction,
    pub outcome: ReconcileOutcome,
}

#[derive(Clone)]
pub struct ApplyObservedStatusHandler {
    transactions: Arc<dyn TransactionRepository>,
    subscription_period_days: i64,
}

impl ApplyObservedStatusHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>, subscription_period_days: i64) -> Self {
        Self {
            transactions,
            subscription_period_days,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApplyObservedStatusCommand,
    ) -> Result<ApplyObservedStatusResult, BillingError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut transaction = self
                .transactions
                .find_by_session_id(&cmd.session_id)
                .await?
                .ok_or_else(|| BillingError::unknown_session(cmd.session_id.clone()))?;

            let reconciliation = reconcile(
                &transaction,
                cmd.observed,
                cmd.observed_amount,
                Timestamp::now(),
                self.subscription_period_days,
            );

            if let Some(mismatch) = reconciliation.amount_mismatch {
                tracing::warn!(
                    session_id = %cmd.session_id,
                    expected_cents = mismatch.expected_cents,
                    observed_cents = mismatch.observed_cents,
                    source = %cmd.source,
                    "Gateway amount differs from checkout amount"
                );
            }

            let committed = self
                .transactions
                .commit_reconciliation(&reconciliation)
                .await
                .map_err(|e| commit_error(&cmd.session_id, e))?;

            match committed {
                CommitResult::Applied => {
                    let outcome = reconciliation.outcome();
                    match outcome {
                        ReconcileOutcome::Advanced => tracing::info!(
                            session_id = %cmd.session_id,
                            from = %reconciliation.previous,
                            to = %reconciliation.next,
                            entitlements = reconciliation.commands.len(),
                            source = %cmd.source,
                            "Payment status reconciled"
                        ),
                        ReconcileOutcome::Ignored => tracing::info!(
                            session_id = %cmd.session_id,
                            stored = %reconciliation.previous,
                            observed = %reconciliation.observed,
                            source = %cmd.source,
                            "Ignoring observation that contradicts settled status"
                        ),
                        ReconcileOutcome::Unchanged => tracing::debug!(
                            session_id = %cmd.session_id,
                            status = %reconciliation.next,
                            source = %cmd.source,
                            "Observation changes nothing"
                        ),
                    }

                    transaction.payment_status = reconciliation.next;
                    if outcome == ReconcileOutcome::Advanced {
                        transaction.updated_at = reconciliation.decided_at;
                    }
                    return Ok(ApplyObservedStatusResult {
                        transaction,
                        outcome,
                    });
                }
                CommitResult::Stale => {
                    tracing::debug!(
                        session_id = %cmd.session_id,
                        attempt,
                        source = %cmd.source,
                        "Transaction changed concurrently, re-reading"
                    );
                }
            }
        }

        Err(BillingError::infrastructure(format!(
            "Session {} kept changing during reconciliation",
            cmd.session_id
        )))
    }
}

fn commit_error(session_id: &CheckoutSessionId, err: DomainError) -> BillingError {
    if err.code == ErrorCode::UnknownSession {
        BillingError::unknown_session(session_id.clone())
    } else {
        err.into()
    }
}
