//! DownloadContentHandler - gate, open, and account a content download.
//!
//! The handler opens the stored file and hands back a stream; it never
//! buffers the file itself.

use std::sync::Arc;

use crate::domain::billing::{AccessDecision, BillingError, ContentItem};
use crate::domain::foundation::{ContentId, UserId};
use crate::ports::{ContentStorage, ContentStorageError, StoredContent};

use super::AuthorizeContentHandler;

#[derive(Debug, Clone)]
pub struct DownloadContentQuery {
    pub user_id: UserId,
    pub content_id: ContentId,
}

#[derive(Debug)]
pub struct DownloadContentResult {
    pub item: ContentItem,
    pub filename: String,
    pub media_type: &'static str,
    pub content: StoredContent,
}

pub struct DownloadContentHandler {
    gate: AuthorizeContentHandler,
    storage: Arc<dyn ContentStorage>,
}

impl DownloadContentHandler {
    pub fn new(gate: AuthorizeContentHandler, storage: Arc<dyn ContentStorage>) -> Self {
        Self { gate, storage }
    }

    pub async fn handle(
        &self,
        query: DownloadContentQuery,
    ) -> Result<DownloadContentResult, BillingError> {
        let authorized = self.gate.decide(&query.user_id, &query.content_id).await?;
        if let AccessDecision::Deny(_) = authorized.decision {
            return Err(BillingError::no_entitlement(query.content_id));
        }
        let item = authorized.item;

        let content = self.storage.open(&item.storage_ref).await.map_err(|e| {
            tracing::error!(
                content_id = %item.id,
                storage_ref = %item.storage_ref,
                error = %e,
                "Failed to open stored content"
            );
            match e {
                ContentStorageError::NotFound(_) => {
                    BillingError::not_found("content file", item.id.as_str())
                }
                other => BillingError::storage(other.to_string()),
            }
        })?;

        // Only count downloads whose file actually opened
        self.gate.record_download(&query.user_id, &item).await;

        Ok(DownloadContentResult {
            filename: item.download_filename(),
            media_type: item.file_kind.media_type(),
            content,
            item,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{free_item, paid_item, user, Harness};
    use super::*;
    use crate::adapters::storage::InMemoryContentStorage;
    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;

    struct BrokenStorage;

    #[async_trait]
    impl ContentStorage for BrokenStorage {
        async fn open(&self, _storage_ref: &str) -> Result<StoredContent, ContentStorageError> {
            Err(ContentStorageError::Io("permission denied".to_string()))
        }
    }

    async fn read_all(result: DownloadContentResult) -> Vec<u8> {
        let mut reader = result.content.reader;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await.unwrap();
        bytes
    }

    async fn handler(
        harness: &Harness,
        storage: impl ContentStorage + 'static,
    ) -> DownloadContentHandler {
        let gate = AuthorizeContentHandler::new(
            Arc::new(harness.catalog.clone()),
            Arc::new(harness.store.clone()),
            Arc::new(harness.store.clone()),
            Arc::new(harness.catalog.clone()),
        );
        DownloadContentHandler::new(gate, Arc::new(storage))
    }

    fn query(content_id: &str) -> DownloadContentQuery {
        DownloadContentQuery {
            user_id: user("listener").id,
            content_id: ContentId::new(content_id).unwrap(),
        }
    }

    #[tokio::test]
    async fn free_item_downloads_bytes() {
        let harness = Harness::new();
        harness.catalog.add_item(free_item("free_1")).await;
        let storage = InMemoryContentStorage::new();
        storage.put("free_1.wav", b"RIFF....".to_vec()).await;

        let result = handler(&harness, storage).await.handle(query("free_1")).await.unwrap();

        assert_eq!(result.filename, "Pack free_1.mp3");
        assert_eq!(result.media_type, "audio/mpeg");
        assert_eq!(result.content.len, Some(8));
        assert_eq!(read_all(result).await, b"RIFF....".to_vec());
        assert_eq!(harness.catalog.download_events().await.len(), 1);
    }

    #[tokio::test]
    async fn unentitled_download_is_refused() {
        let harness = Harness::new();
        harness.catalog.add_item(paid_item("pack_1", 499)).await;
        let storage = InMemoryContentStorage::new();
        storage.put("pack_1.wav", b"data".to_vec()).await;

        let err = handler(&harness, storage).await.handle(query("pack_1")).await.unwrap_err();

        assert_eq!(err, BillingError::no_entitlement(ContentId::new("pack_1").unwrap()));
        assert!(harness.catalog.download_events().await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_not_found_and_not_counted() {
        let harness = Harness::new();
        harness.catalog.add_item(free_item("free_1")).await;

        let err = handler(&harness, InMemoryContentStorage::new())
            .await
            .handle(query("free_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::NotFound { .. }));
        assert!(harness.catalog.download_events().await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_storage_is_a_storage_error_and_not_counted() {
        let harness = Harness::new();
        harness.catalog.add_item(free_item("free_1")).await;

        let err = handler(&harness, BrokenStorage)
            .await
            .handle(query("free_1"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::domain::foundation::ErrorCode::StorageError);
        assert!(harness.catalog.download_events().await.is_empty());
    }
}
