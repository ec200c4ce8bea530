//! GetCreatorEarningsHandler - Query handler for a creator's sales summary.

use std::sync::Arc;

use crate::domain::billing::{BillingError, CreatorEarnings};
use crate::domain::foundation::{AuthenticatedUser, ContentId};
use crate::ports::{ContentCatalog, DownloadLog, PurchaseRepository};

#[derive(Debug, Clone)]
pub struct GetCreatorEarningsQuery {
    pub user: AuthenticatedUser,
}

pub struct GetCreatorEarningsHandler {
    catalog: Arc<dyn ContentCatalog>,
    purchases: Arc<dyn PurchaseRepository>,
    download_log: Arc<dyn DownloadLog>,
}

impl GetCreatorEarningsHandler {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        purchases: Arc<dyn PurchaseRepository>,
        download_log: Arc<dyn DownloadLog>,
    ) -> Self {
        Self {
            catalog,
            purchases,
            download_log,
        }
    }

    pub async fn handle(&self, query: GetCreatorEarningsQuery) -> Result<CreatorEarnings, BillingError> {
        if !query.user.role.can_view_earnings() {
            return Err(BillingError::forbidden("Only creators can view earnings"));
        }

        let items = self.catalog.list_by_owner(&query.user.id).await?;
        if items.is_empty() {
            return Ok(CreatorEarnings::default());
        }
        let content_ids: Vec<ContentId> = items.into_iter().map(|item| item.id).collect();

        let amounts: Vec<i64> = self
            .purchases
            .list_by_content(&content_ids)
            .await?
            .iter()
            .map(|p| p.amount_cents)
            .collect();
        let downloads = self.download_log.count_for_content(&content_ids).await?;

        Ok(CreatorEarnings::compute(
            content_ids.len() as u64,
            &amounts,
            downloads,
        ))
    }
}
