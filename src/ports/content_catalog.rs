//! Content catalog port.
//!
//! The catalog is managed outside this service; billing reads items and
//! bumps their download counter.

use async_trait::async_trait;

use crate::domain::billing::ContentItem;
use crate::domain::foundation::{ContentId, DomainError, UserId};

#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Find an item by id.
    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentItem>, DomainError>;

    /// List all items owned by a creator.
    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<ContentItem>, DomainError>;

    /// Add one to the item's download counter.
    async fn increment_download_count(&self, id: &ContentId) -> Result<(), DomainError>;
}
