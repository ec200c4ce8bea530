//! Subscription entitlement and its lifecycle.
//!
//! A user holds at most one `active` subscription. Expiry is a pure function
//! of the clock: an active subscription whose `expires_at` has passed grants
//! nothing, whether or not anything has written `expired` yet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    CheckoutSessionId, DomainError, ErrorCode, StateMachine, SubscriptionId, Timestamp, UserId,
    ValidationError,
};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Active, Cancelled) | (Active, Expired) | (Cancelled, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Cancelled, Expired],
            Cancelled => vec![Expired],
            Expired => vec![],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Time-limited all-access entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    /// Checkout session that paid for the current period.
    pub gateway_subscription_ref: CheckoutSessionId,
    pub status: SubscriptionStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Starts a fresh period of `period_days` beginning at `now`.
    pub fn start(
        user_id: UserId,
        gateway_subscription_ref: CheckoutSessionId,
        now: Timestamp,
        period_days: i64,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            gateway_subscription_ref,
            status: SubscriptionStatus::Active,
            created_at: now,
            expires_at: now.add_days(period_days),
            updated_at: now,
        }
    }

    /// Returns true if the period is over at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Returns true if this subscription grants access at `now`.
    pub fn is_entitled_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && !self.is_expired_at(now)
    }

    /// Returns true if a stored `active` status is stale at `now`.
    pub fn needs_expiry(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.is_expired_at(now)
    }

    /// Marks the subscription expired.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Expired, now)
    }

    /// Cancels the subscription. Access ends immediately.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled, now)
    }

    fn transition_to(&mut self, target: SubscriptionStatus, now: Timestamp) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot move subscription from {} to {}", self.status, target),
            )
        })?;
        self.updated_at = now;
        Ok(())
    }
}

/// Write needed to grant one paid subscription period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionGrant {
    /// No active subscription; insert a new one.
    Insert(Subscription),

    /// Live subscription found; push its expiry out by one period.
    Extend {
        id: SubscriptionId,
        expires_at: Timestamp,
        gateway_subscription_ref: CheckoutSessionId,
    },

    /// Stored `active` row has lapsed; expire it, then insert.
    ExpireAndInsert {
        expired: SubscriptionId,
        replacement: Subscription,
    },
}

/// Decides how to grant a paid period given the user's current `active` row.
///
/// Stores call this while holding whatever guarantees "at most one active per
/// user" (a lock or a serialisable section), so the decision and the write
/// happen together.
pub fn plan_subscription_grant(
    existing_active: Option<&Subscription>,
    user_id: &UserId,
    gateway_subscription_ref: &CheckoutSessionId,
    now: Timestamp,
    period_days: i64,
) -> SubscriptionGrant {
    match existing_active {
        Some(existing) if existing.is_entitled_at(now) => SubscriptionGrant::Extend {
            id: existing.id,
            expires_at: existing.expires_at.add_days(period_days),
            gateway_subscription_ref: gateway_subscription_ref.clone(),
        },
        Some(existing) => SubscriptionGrant::ExpireAndInsert {
            expired: existing.id,
            replacement: Subscription::start(
                user_id.clone(),
                gateway_subscription_ref.clone(),
                now,
                period_days,
            ),
        },
        None => SubscriptionGrant::Insert(Subscription::start(
            user_id.clone(),
            gateway_subscription_ref.clone(),
            now,
            period_days,
        )),
    }
}
