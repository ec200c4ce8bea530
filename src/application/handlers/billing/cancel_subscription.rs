//! CancelSubscriptionHandler - Command handler for ending a subscription early.
//!
//! Cancellation takes effect immediately: the access gate only honours
//! `active` subscriptions, and a fresh subscription checkout is allowed right
//! after.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::SubscriptionRepository;

use super::SubscriptionLifecycle;

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
}

pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    lifecycle: SubscriptionLifecycle,
}

impl CancelSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            lifecycle: SubscriptionLifecycle::new(subscriptions.clone()),
            subscriptions,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let now = Timestamp::now();

        let mut subscription = self
            .lifecycle
            .current(&cmd.user_id, now)
            .await?
            .ok_or_else(|| BillingError::not_found("subscription", cmd.user_id.as_str()))?;

        // Lost a race with expiry or another cancel
        if !self.subscriptions.mark_cancelled(&subscription.id, now).await? {
            return Err(BillingError::not_found("subscription", cmd.user_id.as_str()));
        }
        subscription.cancel(now)?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription.id,
            "Subscription cancelled"
        );

        Ok(CancelSubscriptionResult { subscription })
    }
}
