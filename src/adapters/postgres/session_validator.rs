//! Session-table implementation of the `SessionValidator` port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, UserId};
use crate::ports::SessionValidator;

/// Resolves opaque session tokens issued at login via `user_sessions`.
#[derive(Clone)]
pub struct PostgresSessionValidator {
    pool: PgPool,
}

impl PostgresSessionValidator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionUserRow {
    user_id: String,
    email: String,
    display_name: Option<String>,
    role: String,
    expires_at: DateTime<Utc>,
}

impl SessionUserRow {
    fn into_user(self, now: DateTime<Utc>) -> Result<AuthenticatedUser, AuthError> {
        if self.expires_at <= now {
            return Err(AuthError::TokenExpired);
        }

        let id = UserId::new(self.user_id).map_err(|_| AuthError::UserNotFound)?;
        let role = self.role.parse::<Role>().unwrap_or_else(|_| {
            tracing::warn!(user_id = %id, role = %self.role, "Unknown role, treating as user");
            Role::User
        });

        Ok(AuthenticatedUser::new(id, self.email, self.display_name, role))
    }
}

#[async_trait]
impl SessionValidator for PostgresSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT u.id AS user_id, u.email, u.display_name, u.role, s.expires_at
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Session lookup failed");
            AuthError::service_unavailable(e.to_string())
        })?
        .ok_or(AuthError::InvalidToken)?;

        row.into_user(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(role: &str, expires_in: Duration) -> SessionUserRow {
        SessionUserRow {
            user_id: "user_1".to_string(),
            email: "user@example.com".to_string(),
            display_name: None,
            role: role.to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn live_session_yields_user_with_role() {
        let user = row("creator", Duration::hours(1)).into_user(Utc::now()).unwrap();
        assert_eq!(user.id.as_str(), "user_1");
        assert_eq!(user.role, Role::Creator);
    }

    #[test]
    fn expired_session_is_rejected() {
        let err = row("user", Duration::hours(-1)).into_user(Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn unknown_role_falls_back_to_user() {
        let user = row("superuser", Duration::hours(1)).into_user(Utc::now()).unwrap();
        assert_eq!(user.role, Role::User);
    }
}
