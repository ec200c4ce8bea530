//! StartCheckoutHandler - Command handler for opening a checkout session.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::billing::{BillingError, Transaction, TransactionKind};
use crate::domain::foundation::{
    AuthenticatedUser, CheckoutSessionId, ContentId, DomainError, Timestamp,
};
use crate::ports::{CheckoutRequest, ContentCatalog, PaymentGateway, SubscriptionRepository, TransactionRepository};

use super::{BillingPolicy, SubscriptionLifecycle};

/// Product name shown on the subscription checkout page.
const SUBSCRIPTION_PRODUCT_NAME: &str = "SoundDrops Premium Subscription";

/// What the user wants to pay for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutIntent {
    Purchase { content_id: ContentId },
    Subscription,
}

#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub user: AuthenticatedUser,
    pub intent: CheckoutIntent,
    /// Frontend origin the gateway redirects back to.
    pub origin: String,
}

#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub session_id: CheckoutSessionId,
    pub redirect_url: String,
    pub transaction: Transaction,
}

/// Opens a gateway checkout session and records a pending transaction.
///
/// The transaction is only written after the gateway returns a session, so a
/// gateway failure leaves nothing behind.
pub struct StartCheckoutHandler {
    catalog: Arc<dyn ContentCatalog>,
    transactions: Arc<dyn TransactionRepository>,
    lifecycle: SubscriptionLifecycle,
    gateway: Arc<dyn PaymentGateway>,
    policy: BillingPolicy,
}

impl StartCheckoutHandler {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        transactions: Arc<dyn TransactionRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            catalog,
            transactions,
            lifecycle: SubscriptionLifecycle::new(subscriptions),
            gateway,
            policy,
        }
    }

    pub async fn handle(&self, cmd: StartCheckoutCommand) -> Result<StartCheckoutResult, BillingError> {
        let origin = cmd.origin.trim().trim_end_matches('/');
        if origin.is_empty() {
            return Err(BillingError::invalid_request("Missing redirect origin"));
        }

        let now = Timestamp::now();

        // 1. Price the intent and check its preconditions
        let (kind, content_id, amount_cents, product_name) = match &cmd.intent {
            CheckoutIntent::Purchase { content_id } => {
                let item = self
                    .catalog
                    .find_by_id(content_id)
                    .await?
                    .ok_or_else(|| BillingError::not_found("content", content_id.as_str()))?;
                let price = item
                    .checkout_price()
                    .ok_or_else(|| BillingError::invalid_request("This pack is free"))?;
                (TransactionKind::PackPurchase, Some(item.id), price, item.title)
            }
            CheckoutIntent::Subscription => {
                if self.lifecycle.current(&cmd.user.id, now).await?.is_some() {
                    return Err(BillingError::conflict(
                        "You already have an active subscription",
                    ));
                }
                (
                    TransactionKind::Subscription,
                    None,
                    self.policy.subscription_price_cents,
                    SUBSCRIPTION_PRODUCT_NAME.to_string(),
                )
            }
        };

        // 2. Open the gateway session
        let success_path = match kind {
            TransactionKind::PackPurchase => "purchase-success",
            TransactionKind::Subscription => "subscription-success",
        };
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), kind.as_str().to_string());
        metadata.insert("user_id".to_string(), cmd.user.id.to_string());
        if let Some(content_id) = &content_id {
            metadata.insert("pack_id".to_string(), content_id.to_string());
        }

        let session = self
            .gateway
            .create_session(CheckoutRequest {
                amount_cents,
                currency: self.policy.currency.clone(),
                product_name,
                success_url: format!(
                    "{}/{}?session_id={{CHECKOUT_SESSION_ID}}",
                    origin, success_path
                ),
                cancel_url: format!("{}/browse", origin),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %cmd.user.id,
                    error = %e,
                    "Failed to create checkout session"
                );
                BillingError::from(e)
            })?;

        // 3. Record the pending transaction
        let transaction = match content_id {
            Some(content_id) => Transaction::pending_purchase(
                session.session_id.clone(),
                cmd.user.id.clone(),
                content_id,
                amount_cents,
                self.policy.currency.clone(),
                now,
            ),
            None => Transaction::pending_subscription(
                session.session_id.clone(),
                cmd.user.id.clone(),
                amount_cents,
                self.policy.currency.clone(),
                now,
            ),
        }
        .map_err(DomainError::from)?;

        self.transactions.save(&transaction).await?;

        tracing::info!(
            session_id = %session.session_id,
            user_id = %cmd.user.id,
            kind = %kind,
            amount_cents,
            "Checkout session created"
        );

        Ok(StartCheckoutResult {
            session_id: session.session_id,
            redirect_url: session.redirect_url,
            transaction,
        })
    }
}
