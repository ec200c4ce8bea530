//! Session validation port.
//!
//! Resolves an opaque session token into the caller's identity and role.
//! Handlers receive the resulting `AuthenticatedUser` explicitly; nothing
//! downstream looks up a "current user".
//!
//! # Example Implementation
//!
//! ```ignore
//! #[async_trait]
//! impl SessionValidator for PostgresSessionValidator {
//!     async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
//!         // 1. Look up the session row by token
//!         // 2. Reject if expires_at has passed
//!         // 3. Join the user row for email and role
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates session tokens and extracts user identity.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidToken` for unknown tokens
/// - Return `AuthError::TokenExpired` for sessions past their expiry
/// - Return `AuthError::ServiceUnavailable` for transient store errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a session token and return the authenticated user.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
