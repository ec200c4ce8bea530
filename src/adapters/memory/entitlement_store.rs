//! In-memory entitlement store for testing and development.
//!
//! Transactions, purchases, and subscriptions live behind a single lock so
//! a reconciliation commit (status flip + entitlement write) is one critical
//! section. Not suitable for multi-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{
    plan_subscription_grant, EntitlementCommand, Purchase, Reconciliation, Subscription,
    SubscriptionGrant, SubscriptionStatus, Transaction,
};
use crate::domain::foundation::{
    CheckoutSessionId, ContentId, DomainError, ErrorCode, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{CommitResult, PurchaseRepository, SubscriptionRepository, TransactionRepository};

#[derive(Debug, Default)]
struct StoreState {
    transactions: HashMap<CheckoutSessionId, Transaction>,
    purchases: HashMap<(UserId, ContentId), Purchase>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
}

impl StoreState {
    fn active_subscription(&self, user_id: &UserId) -> Option<&Subscription> {
        self.subscriptions
            .values()
            .find(|s| &s.user_id == user_id && s.status == SubscriptionStatus::Active)
    }

    fn apply(&mut self, command: &EntitlementCommand) {
        match command {
            EntitlementCommand::GrantPurchase(purchase) => {
                self.purchases
                    .entry((purchase.user_id.clone(), purchase.content_id.clone()))
                    .or_insert_with(|| purchase.clone());
            }
            EntitlementCommand::GrantSubscription {
                user_id,
                gateway_subscription_ref,
                period_days,
                granted_at,
            } => {
                let grant = plan_subscription_grant(
                    self.active_subscription(user_id),
                    user_id,
                    gateway_subscription_ref,
                    *granted_at,
                    *period_days,
                );
                self.apply_grant(grant, *granted_at);
            }
        }
    }

    fn apply_grant(&mut self, grant: SubscriptionGrant, now: Timestamp) {
        match grant {
            SubscriptionGrant::Insert(subscription) => {
                self.subscriptions.insert(subscription.id, subscription);
            }
            SubscriptionGrant::Extend {
                id,
                expires_at,
                gateway_subscription_ref,
            } => {
                if let Some(existing) = self.subscriptions.get_mut(&id) {
                    existing.expires_at = expires_at;
                    existing.gateway_subscription_ref = gateway_subscription_ref;
                    existing.updated_at = now;
                }
            }
            SubscriptionGrant::ExpireAndInsert {
                expired,
                replacement,
            } => {
                if let Some(existing) = self.subscriptions.get_mut(&expired) {
                    existing.status = SubscriptionStatus::Expired;
                    existing.updated_at = now;
                }
                self.subscriptions.insert(replacement.id, replacement);
            }
        }
    }
}

/// Single-process implementation of the entitlement store ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntitlementStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a purchase directly, bypassing reconciliation.
    pub async fn insert_purchase(&self, purchase: Purchase) {
        let mut state = self.state.write().await;
        state
            .purchases
            .insert((purchase.user_id.clone(), purchase.content_id.clone()), purchase);
    }

    /// Seed a subscription row directly.
    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub async fn purchase_count(&self) -> usize {
        self.state.read().await.purchases.len()
    }

    pub async fn subscriptions_for(&self, user_id: &UserId) -> Vec<Subscription> {
        self.state
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryEntitlementStore {
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.transactions.contains_key(&transaction.session_id) {
            return Err(DomainError::validation(
                "session_id",
                format!("Transaction already exists for session {}", transaction.session_id),
            ));
        }
        state
            .transactions
            .insert(transaction.session_id.clone(), transaction.clone());
        Ok(())
    }

    async fn find_by_session_id(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<Transaction>, DomainError> {
        Ok(self.state.read().await.transactions.get(session_id).cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError> {
        let state = self.state.read().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn commit_reconciliation(
        &self,
        reconciliation: &Reconciliation,
    ) -> Result<CommitResult, DomainError> {
        if reconciliation.is_noop() {
            return Ok(CommitResult::Applied);
        }

        let mut state = self.state.write().await;

        let mut transaction = state
            .transactions
            .get(&reconciliation.session_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::UnknownSession,
                    format!("No transaction for session {}", reconciliation.session_id),
                )
            })?;

        if transaction.payment_status != reconciliation.previous {
            return Ok(CommitResult::Stale);
        }

        transaction.settle(reconciliation.next, reconciliation.decided_at)?;

        for command in &reconciliation.commands {
            state.apply(command);
        }
        state
            .transactions
            .insert(transaction.session_id.clone(), transaction);

        Ok(CommitResult::Applied)
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryEntitlementStore {
    async fn find(
        &self,
        user_id: &UserId,
        content_id: &ContentId,
    ) -> Result<Option<Purchase>, DomainError> {
        let key = (user_id.clone(), content_id.clone());
        Ok(self.state.read().await.purchases.get(&key).cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>, DomainError> {
        let state = self.state.read().await;
        let mut purchases: Vec<Purchase> = state
            .purchases
            .values()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }

    async fn list_by_content(
        &self,
        content_ids: &[ContentId],
    ) -> Result<Vec<Purchase>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .purchases
            .values()
            .filter(|p| content_ids.contains(&p.content_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryEntitlementStore {
    async fn find_active_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.state.read().await.active_subscription(user_id).cloned())
    }

    async fn mark_expired(&self, id: &SubscriptionId, now: Timestamp) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        match state.subscriptions.get_mut(id) {
            Some(sub) if sub.needs_expiry(now) => {
                sub.expire(now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_cancelled(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        match state.subscriptions.get_mut(id) {
            Some(sub) if sub.status == SubscriptionStatus::Active => {
                sub.cancel(now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_due(&self, now: Timestamp) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;
        let mut expired = 0;
        for sub in state.subscriptions.values_mut() {
            if sub.needs_expiry(now) {
                sub.expire(now)?;
                expired += 1;
            }
        }
        Ok(expired)
    }
}
