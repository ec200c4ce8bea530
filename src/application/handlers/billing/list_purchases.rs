//! ListPurchasesHandler - Query handler for the caller's purchase history.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Purchase};
use crate::domain::foundation::UserId;
use crate::ports::PurchaseRepository;

#[derive(Debug, Clone)]
pub struct ListPurchasesQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct ListPurchasesResult {
    /// Newest first.
    pub purchases: Vec<Purchase>,
}

pub struct ListPurchasesHandler {
    purchases: Arc<dyn PurchaseRepository>,
}

impl ListPurchasesHandler {
    pub fn new(purchases: Arc<dyn PurchaseRepository>) -> Self {
        Self { purchases }
    }

    pub async fn handle(&self, query: ListPurchasesQuery) -> Result<ListPurchasesResult, BillingError> {
        let purchases = self.purchases.list_by_user(&query.user_id).await?;
        Ok(ListPurchasesResult { purchases })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::domain::foundation::{CheckoutSessionId, ContentId, PurchaseId, Timestamp};

    fn purchase(user: &str, content: &str, days_ago: i64) -> Purchase {
        Purchase {
            id: PurchaseId::new(),
            user_id: UserId::new(user).unwrap(),
            content_id: ContentId::new(content).unwrap(),
            amount_cents: 299,
            session_id: CheckoutSessionId::new(format!("cs_{}", content)).unwrap(),
            created_at: Timestamp::now().minus_days(days_ago),
        }
    }

    #[tokio::test]
    async fn lists_only_own_purchases_newest_first() {
        let store = InMemoryEntitlementStore::new();
        store.insert_purchase(purchase("alice", "old", 5)).await;
        store.insert_purchase(purchase("alice", "new", 1)).await;
        store.insert_purchase(purchase("bob", "other", 1)).await;
        let handler = ListPurchasesHandler::new(Arc::new(store));

        let result = handler
            .handle(ListPurchasesQuery {
                user_id: UserId::new("alice").unwrap(),
            })
            .await
            .unwrap();

        let ids: Vec<&str> = result.purchases.iter().map(|p| p.content_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn no_purchases_is_empty() {
        let handler = ListPurchasesHandler::new(Arc::new(InMemoryEntitlementStore::new()));

        let result = handler
            .handle(ListPurchasesQuery {
                user_id: UserId::new("nobody").unwrap(),
            })
            .await
            .unwrap();

        assert!(result.purchases.is_empty());
    }
}
