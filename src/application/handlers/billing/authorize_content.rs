//! AuthorizeContentHandler - the access gate.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. Free content
//! 2. A purchase of this item by the user
//! 3. A live subscription (after lazy expiry)
//!
//! Anything else is denied with `NoEntitlement`. Allowed downloads are
//! accounted (download event + counter); accounting failures are logged and
//! never block delivery.

use std::sync::Arc;

use crate::domain::billing::{
    AccessDecision, AccessGrant, AccessPurpose, BillingError, ContentItem, DenyReason,
    DownloadEvent,
};
use crate::domain::foundation::{ContentId, Timestamp, UserId};
use crate::ports::{ContentCatalog, DownloadLog, PurchaseRepository, SubscriptionRepository};

use super::SubscriptionLifecycle;

#[derive(Debug, Clone)]
pub struct AuthorizeContentQuery {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub purpose: AccessPurpose,
}

#[derive(Debug, Clone)]
pub struct AuthorizeContentResult {
    pub item: ContentItem,
    pub decision: AccessDecision,
}

#[derive(Clone)]
pub struct AuthorizeContentHandler {
    catalog: Arc<dyn ContentCatalog>,
    purchases: Arc<dyn PurchaseRepository>,
    lifecycle: SubscriptionLifecycle,
    download_log: Arc<dyn DownloadLog>,
}

impl AuthorizeContentHandler {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        purchases: Arc<dyn PurchaseRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        download_log: Arc<dyn DownloadLog>,
    ) -> Self {
        Self {
            catalog,
            purchases,
            lifecycle: SubscriptionLifecycle::new(subscriptions),
            download_log,
        }
    }

    /// Decides access and, for allowed downloads, records the download.
    pub async fn handle(
        &self,
        query: AuthorizeContentQuery,
    ) -> Result<AuthorizeContentResult, BillingError> {
        let result = self.decide(&query.user_id, &query.content_id).await?;

        if result.decision.is_allowed() && query.purpose == AccessPurpose::Download {
            self.record_download(&query.user_id, &result.item).await;
        }

        Ok(result)
    }

    /// Decides access without any accounting.
    pub async fn decide(
        &self,
        user_id: &UserId,
        content_id: &ContentId,
    ) -> Result<AuthorizeContentResult, BillingError> {
        let item = self
            .catalog
            .find_by_id(content_id)
            .await?
            .ok_or_else(|| BillingError::not_found("content", content_id.as_str()))?;

        let decision = if item.is_free {
            AccessDecision::Allow(AccessGrant::FreeContent)
        } else if self.purchases.find(user_id, &item.id).await?.is_some() {
            AccessDecision::Allow(AccessGrant::Purchased)
        } else if self.lifecycle.current(user_id, Timestamp::now()).await?.is_some() {
            AccessDecision::Allow(AccessGrant::Subscribed)
        } else {
            AccessDecision::Deny(DenyReason::NoEntitlement)
        };

        tracing::debug!(
            user_id = %user_id,
            content_id = %content_id,
            decision = decision.reason(),
            "Access decided"
        );

        Ok(AuthorizeContentResult { item, decision })
    }

    /// Appends a download event and bumps the item's counter. Never fails.
    pub async fn record_download(&self, user_id: &UserId, item: &ContentItem) {
        let event = DownloadEvent::new(user_id.clone(), item.id.clone(), Timestamp::now());

        if let Err(e) = self.download_log.record(&event).await {
            tracing::warn!(
                user_id = %user_id,
                content_id = %item.id,
                error = %e,
                "Failed to record download event"
            );
        }
        if let Err(e) = self.catalog.increment_download_count(&item.id).await {
            tracing::warn!(
                content_id = %item.id,
                error = %e,
                "Failed to increment download count"
            );
        }
    }
}
