//! Subscription lifecycle - lazy expiry on read, plus an optional sweep.
//!
//! Expiry is a pure function of `now >= expires_at`. Every read that needs
//! "the user's subscription" goes through [`SubscriptionLifecycle::current`],
//! which flips a lapsed `active` row to `expired` with a conditional write
//! before answering. The sweep only saves those reads some work.

use std::sync::Arc;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

#[derive(Clone)]
pub struct SubscriptionLifecycle {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionLifecycle {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Returns the user's entitling subscription at `now`, if any.
    ///
    /// A stored `active` row whose period is over is expired on the spot and
    /// `None` is returned.
    pub async fn current(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        match self.subscriptions.find_active_by_user(user_id).await? {
            Some(subscription) if subscription.needs_expiry(now) => {
                if self.subscriptions.mark_expired(&subscription.id, now).await? {
                    tracing::info!(
                        user_id = %user_id,
                        subscription_id = %subscription.id,
                        expires_at = %subscription.expires_at,
                        "Subscription expired on read"
                    );
                }
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Expires every lapsed `active` subscription. Returns how many flipped.
    pub async fn sweep(&self, now: Timestamp) -> Result<u64, DomainError> {
        let expired = self.subscriptions.expire_due(now).await?;
        if expired > 0 {
            tracing::info!(expired, "Expiry sweep completed");
        } else {
            tracing::debug!("Expiry sweep found nothing due");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::domain::billing::SubscriptionStatus;
    use crate::domain::foundation::CheckoutSessionId;

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    fn subscription_started_days_ago(days: i64, period_days: i64) -> Subscription {
        Subscription::start(
            user(),
            CheckoutSessionId::new("cs_sub").unwrap(),
            Timestamp::now().minus_days(days),
            period_days,
        )
    }

    #[tokio::test]
    async fn live_subscription_is_returned() {
        let store = InMemoryEntitlementStore::new();
        let sub = subscription_started_days_ago(1, 30);
        store.insert_subscription(sub.clone()).await;
        let lifecycle = SubscriptionLifecycle::new(Arc::new(store));

        let current = lifecycle.current(&user(), Timestamp::now()).await.unwrap();
        assert_eq!(current.map(|s| s.id), Some(sub.id));
    }

    #[tokio::test]
    async fn lapsed_subscription_is_expired_on_read() {
        let store = InMemoryEntitlementStore::new();
        store.insert_subscription(subscription_started_days_ago(31, 30)).await;
        let lifecycle = SubscriptionLifecycle::new(Arc::new(store.clone()));

        let current = lifecycle.current(&user(), Timestamp::now()).await.unwrap();

        assert!(current.is_none());
        let stored = store.subscriptions_for(&user()).await;
        assert_eq!(stored[0].status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn no_subscription_is_none() {
        let lifecycle = SubscriptionLifecycle::new(Arc::new(InMemoryEntitlementStore::new()));
        assert!(lifecycle.current(&user(), Timestamp::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_expires_only_lapsed_rows() {
        let store = InMemoryEntitlementStore::new();
        store.insert_subscription(subscription_started_days_ago(40, 30)).await;
        let other = Subscription::start(
            UserId::new("user_2").unwrap(),
            CheckoutSessionId::new("cs_other").unwrap(),
            Timestamp::now(),
            30,
        );
        store.insert_subscription(other).await;
        let lifecycle = SubscriptionLifecycle::new(Arc::new(store));

        assert_eq!(lifecycle.sweep(Timestamp::now()).await.unwrap(), 1);
        assert_eq!(lifecycle.sweep(Timestamp::now()).await.unwrap(), 0);
    }
}
