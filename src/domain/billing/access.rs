//! Access decisions for content delivery.

use serde::{Deserialize, Serialize};

/// Why content is being requested. Only downloads are accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPurpose {
    Download,
    Preview,
}

/// Which rule allowed access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessGrant {
    FreeContent,
    Purchased,
    Subscribed,
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NoEntitlement,
}

/// Outcome of the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow(AccessGrant),
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow(_))
    }

    /// Short machine-readable reason, for either outcome.
    pub fn reason(&self) -> &'static str {
        match self {
            AccessDecision::Allow(AccessGrant::FreeContent) => "free_content",
            AccessDecision::Allow(AccessGrant::Purchased) => "purchased",
            AccessDecision::Allow(AccessGrant::Subscribed) => "subscribed",
            AccessDecision::Deny(DenyReason::NoEntitlement) => "no_entitlement",
        }
    }
}
