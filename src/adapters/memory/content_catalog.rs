//! In-memory catalog and download log.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{ContentItem, DownloadEvent};
use crate::domain::foundation::{ContentId, DomainError, UserId};
use crate::ports::{ContentCatalog, DownloadLog};

/// Catalog items and download events held in memory.
///
/// `fail_accounting` makes every accounting write fail, for exercising the
/// "accounting never blocks delivery" path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentCatalog {
    items: Arc<RwLock<HashMap<ContentId, ContentItem>>>,
    downloads: Arc<RwLock<Vec<DownloadEvent>>>,
    fail_accounting: Arc<AtomicBool>,
}

impl InMemoryContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::add_item`].
    pub async fn with_item(self, item: ContentItem) -> Self {
        self.add_item(item).await;
        self
    }

    pub async fn add_item(&self, item: ContentItem) {
        self.items.write().await.insert(item.id.clone(), item);
    }

    pub fn fail_accounting(&self, fail: bool) {
        self.fail_accounting.store(fail, Ordering::SeqCst);
    }

    pub async fn download_events(&self) -> Vec<DownloadEvent> {
        self.downloads.read().await.clone()
    }

    fn check_accounting(&self) -> Result<(), DomainError> {
        if self.fail_accounting.load(Ordering::SeqCst) {
            return Err(DomainError::database("accounting store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentCatalog for InMemoryContentCatalog {
    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentItem>, DomainError> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<ContentItem>, DomainError> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .filter(|item| &item.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn increment_download_count(&self, id: &ContentId) -> Result<(), DomainError> {
        self.check_accounting()?;
        if let Some(item) = self.items.write().await.get_mut(id) {
            item.download_count += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl DownloadLog for InMemoryContentCatalog {
    async fn record(&self, event: &DownloadEvent) -> Result<(), DomainError> {
        self.check_accounting()?;
        self.downloads.write().await.push(event.clone());
        Ok(())
    }

    async fn count_for_content(&self, content_ids: &[ContentId]) -> Result<u64, DomainError> {
        Ok(self
            .downloads
            .read()
            .await
            .iter()
            .filter(|event| content_ids.contains(&event.content_id))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::FileKind;
    use crate::domain::foundation::Timestamp;

    fn item(id: &str, owner: &str) -> ContentItem {
        ContentItem {
            id: ContentId::new(id).unwrap(),
            title: id.to_string(),
            owner_id: UserId::new(owner).unwrap(),
            is_free: false,
            price_cents: 499,
            storage_ref: format!("{}.mp3", id),
            file_kind: FileKind::Audio,
            download_count: 0,
        }
    }

    #[tokio::test]
    async fn list_by_owner_filters() {
        let catalog = InMemoryContentCatalog::new()
            .with_item(item("pack_1", "alice"))
            .await
            .with_item(item("pack_2", "bob"))
            .await;

        let owned = catalog.list_by_owner(&UserId::new("alice").unwrap()).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id.as_str(), "pack_1");
    }

    #[tokio::test]
    async fn increment_bumps_counter() {
        let catalog = InMemoryContentCatalog::new().with_item(item("pack_1", "alice")).await;
        let id = ContentId::new("pack_1").unwrap();

        catalog.increment_download_count(&id).await.unwrap();
        catalog.increment_download_count(&id).await.unwrap();

        assert_eq!(catalog.find_by_id(&id).await.unwrap().unwrap().download_count, 2);
    }

    #[tokio::test]
    async fn failing_accounting_rejects_writes() {
        let catalog = InMemoryContentCatalog::new();
        catalog.fail_accounting(true);

        let event = DownloadEvent::new(
            UserId::new("u").unwrap(),
            ContentId::new("pack_1").unwrap(),
            Timestamp::now(),
        );
        assert!(catalog.record(&event).await.is_err());
        assert!(catalog.download_events().await.is_empty());
    }
}
