//! Checkout transaction aggregate.
//!
//! One transaction per gateway checkout session. It is created `pending`
//! once the gateway has accepted the session and afterwards only changes
//! through reconciliation.
//!
//! Money is stored as i64 minor units (cents) together with a lowercase
//! ISO currency code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    CheckoutSessionId, ContentId, StateMachine, Timestamp, TransactionId, UserId, ValidationError,
};

use super::PaymentStatus;

/// What a checkout pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    PackPurchase,
    Subscription,
}

impl TransactionKind {
    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::PackPurchase => "pack_purchase",
            TransactionKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pack_purchase" => Ok(TransactionKind::PackPurchase),
            "subscription" => Ok(TransactionKind::Subscription),
            other => Err(ValidationError::invalid_format(
                "kind",
                format!("unknown transaction kind '{}'", other),
            )),
        }
    }
}

/// A payment attempt, keyed by its gateway session.
///
/// # Invariants
///
/// - `session_id` is unique across all transactions
/// - `kind == PackPurchase` iff `target_ref.is_some()`
/// - `amount_cents > 0`
/// - `payment_status` only moves forward (see [`PaymentStatus`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub session_id: CheckoutSessionId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub kind: TransactionKind,
    pub target_ref: Option<ContentId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Transaction {
    /// Creates a pending transaction for a single pack purchase.
    pub fn pending_purchase(
        session_id: CheckoutSessionId,
        user_id: UserId,
        content_id: ContentId,
        amount_cents: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        Self::pending(
            session_id,
            user_id,
            TransactionKind::PackPurchase,
            Some(content_id),
            amount_cents,
            currency.into(),
            now,
        )
    }

    /// Creates a pending transaction for a subscription period.
    pub fn pending_subscription(
        session_id: CheckoutSessionId,
        user_id: UserId,
        amount_cents: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        Self::pending(
            session_id,
            user_id,
            TransactionKind::Subscription,
            None,
            amount_cents,
            currency.into(),
            now,
        )
    }

    fn pending(
        session_id: CheckoutSessionId,
        user_id: UserId,
        kind: TransactionKind,
        target_ref: Option<ContentId>,
        amount_cents: i64,
        currency: String,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount_cents <= 0 {
            return Err(ValidationError::out_of_range(
                "amount_cents",
                1,
                i64::MAX,
                amount_cents,
            ));
        }
        validate_currency(&currency)?;

        Ok(Self {
            id: TransactionId::new(),
            session_id,
            user_id,
            amount_cents,
            currency,
            payment_status: PaymentStatus::Pending,
            kind,
            target_ref,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the status forward, rejecting any regression.
    pub fn settle(&mut self, status: PaymentStatus, now: Timestamp) -> Result<(), ValidationError> {
        self.payment_status = self.payment_status.transition_to(status)?;
        self.updated_at = now;
        Ok(())
    }

    /// Returns true if this transaction pays for a pack.
    pub fn is_purchase(&self) -> bool {
        self.kind == TransactionKind::PackPurchase
    }
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    let well_formed = currency.len() == 3 && currency.chars().all(|c| c.is_ascii_lowercase());
    if !well_formed {
        return Err(ValidationError::invalid_format(
            "currency",
            "expected a lowercase three-letter ISO code",
        ));
    }
    Ok(())
}
