//! Download accounting port.

use async_trait::async_trait;

use crate::domain::billing::DownloadEvent;
use crate::domain::foundation::{ContentId, DomainError};

/// Append-only log of authorized downloads.
#[async_trait]
pub trait DownloadLog: Send + Sync {
    /// Append one download event.
    async fn record(&self, event: &DownloadEvent) -> Result<(), DomainError>;

    /// Count recorded downloads of any of the given items.
    async fn count_for_content(&self, content_ids: &[ContentId]) -> Result<u64, DomainError>;
}
