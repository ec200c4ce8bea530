//! Purchase entitlement.
//!
//! A purchase is derived from a paid pack-purchase transaction and is unique
//! per `(user_id, content_id)`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CheckoutSessionId, ContentId, PurchaseId, Timestamp, UserId};

use super::{Transaction, TransactionKind};

/// Durable proof that a user bought a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub amount_cents: i64,
    pub session_id: CheckoutSessionId,
    pub created_at: Timestamp,
}

impl Purchase {
    /// Derives the purchase granted by a paid pack-purchase transaction.
    ///
    /// Returns `None` for subscription transactions. The owner is always the
    /// transaction's user, whoever happened to observe the payment.
    pub fn from_transaction(tx: &Transaction, now: Timestamp) -> Option<Self> {
        if tx.kind != TransactionKind::PackPurchase {
            return None;
        }
        let content_id = tx.target_ref.clone()?;
        Some(Self {
            id: PurchaseId::new(),
            user_id: tx.user_id.clone(),
            content_id,
            amount_cents: tx.amount_cents,
            session_id: tx.session_id.clone(),
            created_at: now,
        })
    }
}
