//! Purchase repository port (read side).
//!
//! Purchases are only ever created through
//! [`super::TransactionRepository::commit_reconciliation`]; this port reads
//! them back for the access gate and reporting.

use async_trait::async_trait;

use crate::domain::billing::Purchase;
use crate::domain::foundation::{ContentId, DomainError, UserId};

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Find the purchase of `content_id` by `user_id`, if any.
    async fn find(
        &self,
        user_id: &UserId,
        content_id: &ContentId,
    ) -> Result<Option<Purchase>, DomainError>;

    /// List a user's purchases, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>, DomainError>;

    /// List all purchases of any of the given items.
    async fn list_by_content(&self, content_ids: &[ContentId])
        -> Result<Vec<Purchase>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PurchaseRepository) {}
    }
}
