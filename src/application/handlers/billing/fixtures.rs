//! Shared builders for billing handler tests.

use std::sync::Arc;

use crate::adapters::memory::{InMemoryContentCatalog, InMemoryEntitlementStore};
use crate::adapters::stripe::MockPaymentGateway;
use crate::domain::billing::{ContentItem, FileKind};
use crate::domain::foundation::{AuthenticatedUser, ContentId, Role, UserId};

use super::{ApplyObservedStatusHandler, BillingPolicy};

pub fn user(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(id).unwrap(),
        format!("{}@example.com", id),
        None,
        Role::User,
    )
}

pub fn creator(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(id).unwrap(),
        format!("{}@example.com", id),
        Some("Beat Maker".to_string()),
        Role::Creator,
    )
}

pub fn paid_item(id: &str, price_cents: i64) -> ContentItem {
    ContentItem {
        id: ContentId::new(id).unwrap(),
        title: format!("Pack {}", id),
        owner_id: UserId::new("creator_1").unwrap(),
        is_free: false,
        price_cents,
        storage_ref: format!("{}.wav", id),
        file_kind: FileKind::Audio,
        download_count: 0,
    }
}

pub fn free_item(id: &str) -> ContentItem {
    ContentItem {
        is_free: true,
        price_cents: 0,
        ..paid_item(id, 0)
    }
}

/// In-memory adapters wired together.
pub struct Harness {
    pub store: InMemoryEntitlementStore,
    pub catalog: InMemoryContentCatalog,
    pub gateway: MockPaymentGateway,
    pub policy: BillingPolicy,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: InMemoryEntitlementStore::new(),
            catalog: InMemoryContentCatalog::new(),
            gateway: MockPaymentGateway::new(),
            policy: BillingPolicy::default(),
        }
    }

    pub fn reconciler(&self) -> ApplyObservedStatusHandler {
        ApplyObservedStatusHandler::new(
            Arc::new(self.store.clone()),
            self.policy.subscription_period_days,
        )
    }
}
