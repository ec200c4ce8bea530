//! Pure payment reconciliation.
//!
//! Poll results and webhook deliveries are both "observations" of a
//! checkout's payment status. [`reconcile`] folds one observation into the
//! stored transaction and returns the next status plus the entitlement
//! writes that must accompany it. It performs no I/O: the caller hands the
//! result to the store, which commits it with a compare-and-swap on the
//! status it was computed from.
//!
//! ```text
//!   stored     observed              next      commands
//!   pending    paid               -> paid      [grant purchase | grant subscription]
//!   pending    failed | expired   -> observed  []
//!   pending    pending            -> pending   []
//!   settled    anything           -> settled   []
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CheckoutSessionId, StateMachine, Timestamp, UserId};

use super::{PaymentStatus, Purchase, Transaction, TransactionKind};

/// Where an observation came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationSource {
    Poll,
    Webhook,
}

impl std::fmt::Display for ObservationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservationSource::Poll => f.write_str("poll"),
            ObservationSource::Webhook => f.write_str("webhook"),
        }
    }
}

/// Side-effecting write emitted by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementCommand {
    /// Insert the purchase unless `(user_id, content_id)` already has one.
    GrantPurchase(Purchase),

    /// Grant one subscription period; the store resolves it against the
    /// user's current active row with [`super::plan_subscription_grant`].
    GrantSubscription {
        user_id: UserId,
        gateway_subscription_ref: CheckoutSessionId,
        period_days: i64,
        granted_at: Timestamp,
    },
}

/// Gateway-reported amount that disagrees with what was charged at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountMismatch {
    pub expected_cents: i64,
    pub observed_cents: i64,
}

/// How an observation related to the stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Status moved forward.
    Advanced,
    /// Observation matched nothing new (still pending, or repeats the settled outcome).
    Unchanged,
    /// Observation contradicts a settled status and was dropped.
    Ignored,
}

/// Result of folding one observation into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub session_id: CheckoutSessionId,
    /// Status the decision was computed from; the store commits only if it still holds.
    pub previous: PaymentStatus,
    pub observed: PaymentStatus,
    pub next: PaymentStatus,
    pub commands: Vec<EntitlementCommand>,
    pub amount_mismatch: Option<AmountMismatch>,
    pub decided_at: Timestamp,
}

impl Reconciliation {
    /// Returns true if there is nothing to write.
    pub fn is_noop(&self) -> bool {
        self.previous == self.next
    }

    /// Classifies the observation.
    pub fn outcome(&self) -> ReconcileOutcome {
        if !self.is_noop() {
            ReconcileOutcome::Advanced
        } else if self.previous.is_settled() && self.observed != self.previous {
            ReconcileOutcome::Ignored
        } else {
            ReconcileOutcome::Unchanged
        }
    }
}

/// Folds an observed payment status into the stored transaction.
///
/// `observed_amount` is the gateway's `amount_total` when it reported one.
/// A mismatch is reported but does not block the transition.
pub fn reconcile(
    tx: &Transaction,
    observed: PaymentStatus,
    observed_amount: Option<i64>,
    now: Timestamp,
    subscription_period_days: i64,
) -> Reconciliation {
    let previous = tx.payment_status;
    let next = if previous.can_transition_to(&observed) {
        observed
    } else {
        previous
    };

    let mut commands = Vec::new();
    let mut amount_mismatch = None;

    if previous != next && next == PaymentStatus::Paid {
        amount_mismatch = observed_amount
            .filter(|amount| *amount != tx.amount_cents)
            .map(|observed_cents| AmountMismatch {
                expected_cents: tx.amount_cents,
                observed_cents,
            });

        match tx.kind {
            TransactionKind::PackPurchase => {
                if let Some(purchase) = Purchase::from_transaction(tx, now) {
                    commands.push(EntitlementCommand::GrantPurchase(purchase));
                }
            }
            TransactionKind::Subscription => {
                commands.push(EntitlementCommand::GrantSubscription {
                    user_id: tx.user_id.clone(),
                    gateway_subscription_ref: tx.session_id.clone(),
                    period_days: subscription_period_days,
                    granted_at: now,
                });
            }
        }
    }

    Reconciliation {
        session_id: tx.session_id.clone(),
        previous,
        observed,
        next,
        commands,
        amount_mismatch,
        decided_at: now,
    }
}
