//! Mock session validator for tests and local development.
//!
//! # Example
//!
//! ```ignore
//! use sounddrops::adapters::auth::MockSessionValidator;
//! use sounddrops::domain::foundation::Role;
//!
//! let validator = MockSessionValidator::new()
//!     .with_test_user("buyer-token", "user_buyer", Role::User)
//!     .with_test_user("creator-token", "user_creator", Role::Creator);
//!
//! let user = validator.validate("buyer-token").await?;
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, UserId};
use crate::ports::SessionValidator;

/// Token-to-user map. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set.
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for a fully specified user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Registers a token for a generated user with the given id and role.
    ///
    /// Blank ids are skipped.
    pub fn with_test_user(self, token: impl Into<String>, user_id: &str, role: Role) -> Self {
        if let Ok(id) = UserId::new(user_id) {
            let user = AuthenticatedUser::new(
                id,
                format!("{}@test.sounddrops.local", user_id),
                Some(format!("Test {}", user_id)),
                role,
            );
            self.add_token(token, user);
        }
        self
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *write(&self.force_error) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *write(&self.force_error) = None;
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        write(&self.tokens).insert(token.into(), user);
    }

    pub fn remove_token(&self, token: &str) {
        write(&self.tokens).remove(token);
    }
}

// A panicking test must not poison every later lookup.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = read(&self.force_error).clone() {
            return Err(error);
        }

        read(&self.tokens)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
