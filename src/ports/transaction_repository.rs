//! Transaction repository port.
//!
//! Stores checkout transactions keyed by gateway session and commits
//! reconciliation results atomically with the entitlements they grant.
//!
//! # Atomicity
//!
//! [`TransactionRepository::commit_reconciliation`] is the only write path
//! for payment status. It must:
//!
//! 1. Apply the status change only if the stored status still equals
//!    `Reconciliation::previous` (compare-and-swap)
//! 2. Execute every `EntitlementCommand` in the same unit of work
//! 3. Make the status flip and the entitlement visible together
//!
//! Two processes racing on the same session therefore see exactly one
//! `Applied`; the loser gets `Stale` and re-reads.

use async_trait::async_trait;

use crate::domain::billing::{Reconciliation, Transaction};
use crate::domain::foundation::{CheckoutSessionId, DomainError, UserId};

/// Outcome of a compare-and-swap commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    /// Status and entitlements were written.
    Applied,
    /// Stored status no longer matched; nothing was written.
    Stale,
}

/// Repository port for checkout transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persist a new pending transaction.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if a transaction already exists for the session
    /// - `DatabaseError` on persistence failure
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Find a transaction by its gateway session.
    async fn find_by_session_id(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<Transaction>, DomainError>;

    /// List a user's transactions, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError>;

    /// Atomically apply a reconciliation and its entitlement commands.
    ///
    /// No-op reconciliations return `Applied` without writing.
    ///
    /// # Errors
    ///
    /// - `UnknownSession` if the transaction vanished
    /// - `DatabaseError` on persistence failure
    async fn commit_reconciliation(
        &self,
        reconciliation: &Reconciliation,
    ) -> Result<CommitResult, DomainError>;
}
