//! HTTP middleware for axum.
//!
//! - `auth` - Session authentication middleware and extractors

pub mod auth;

pub use auth::{auth_middleware, extract_token, AuthRejection, AuthState, RequireAuth, SESSION_COOKIE};
