//! Subscription repository port.
//!
//! Subscriptions are granted through
//! [`super::TransactionRepository::commit_reconciliation`]. This port covers
//! reads and the lifecycle writes that follow: lazy expiry, cancellation,
//! and the optional sweep.
//!
//! Every write is conditional on the stored status so concurrent readers
//! expiring the same row do not conflict.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the user's subscription whose stored status is `active`.
    ///
    /// The row may already be past `expires_at`; callers apply lazy expiry.
    async fn find_active_by_user(&self, user_id: &UserId)
        -> Result<Option<Subscription>, DomainError>;

    /// Move an `active` subscription whose period ended by `now` to `expired`.
    ///
    /// Returns `false` if the row was no longer active or was extended past
    /// `now` in the meantime.
    async fn mark_expired(&self, id: &SubscriptionId, now: Timestamp) -> Result<bool, DomainError>;

    /// Move an `active` subscription to `cancelled`.
    ///
    /// Returns `false` if the row was no longer active.
    async fn mark_cancelled(&self, id: &SubscriptionId, now: Timestamp)
        -> Result<bool, DomainError>;

    /// Expire every `active` subscription whose period has ended.
    ///
    /// Returns the number of rows changed.
    async fn expire_due(&self, now: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
