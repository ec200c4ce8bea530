//! GetSubscriptionStatusHandler - Query handler for the caller's subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::SubscriptionRepository;

use super::SubscriptionLifecycle;

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSubscriptionStatusResult {
    pub is_subscribed: bool,
    pub subscription: Option<Subscription>,
}

pub struct GetSubscriptionStatusHandler {
    lifecycle: SubscriptionLifecycle,
}

impl GetSubscriptionStatusHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            lifecycle: SubscriptionLifecycle::new(subscriptions),
        }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, BillingError> {
        let subscription = self.lifecycle.current(&query.user_id, Timestamp::now()).await?;

        Ok(GetSubscriptionStatusResult {
            is_subscribed: subscription.is_some(),
            subscription,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::domain::foundation::CheckoutSessionId;

    fn user_id() -> UserId {
        UserId::new("subscriber").unwrap()
    }

    async fn handler_with(started_days_ago: Option<i64>) -> GetSubscriptionStatusHandler {
        let store = InMemoryEntitlementStore::new();
        if let Some(days) = started_days_ago {
            store
                .insert_subscription(Subscription::start(
                    user_id(),
                    CheckoutSessionId::new("cs_sub").unwrap(),
                    Timestamp::now().minus_days(days),
                    30,
                ))
                .await;
        }
        GetSubscriptionStatusHandler::new(Arc::new(store))
    }

    #[tokio::test]
    async fn active_subscription_is_reported() {
        let handler = handler_with(Some(3)).await;

        let result = handler
            .handle(GetSubscriptionStatusQuery { user_id: user_id() })
            .await
            .unwrap();

        assert!(result.is_subscribed);
        assert!(result.subscription.is_some());
    }

    #[tokio::test]
    async fn lapsed_subscription_reads_as_unsubscribed() {
        let handler = handler_with(Some(45)).await;

        let result = handler
            .handle(GetSubscriptionStatusQuery { user_id: user_id() })
            .await
            .unwrap();

        assert!(!result.is_subscribed);
        assert!(result.subscription.is_none());
    }

    #[tokio::test]
    async fn never_subscribed() {
        let handler = handler_with(None).await;

        let result = handler
            .handle(GetSubscriptionStatusQuery { user_id: user_id() })
            .await
            .unwrap();

        assert_eq!(
            result,
            GetSubscriptionStatusResult {
                is_subscribed: false,
                subscription: None
            }
        );
    }
}
