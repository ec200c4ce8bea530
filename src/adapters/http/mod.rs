//! HTTP adapters - REST API implementations.

pub mod billing;
pub mod middleware;

use axum::{routing::get, Json, Router};

pub use billing::{billing_routes, BillingAppState};
pub use middleware::{auth_middleware, AuthState};

/// Assemble the full API: billing routes under `/api` behind the session
/// middleware, plus an unauthenticated `/health`.
pub fn app_router(state: BillingAppState, validator: AuthState) -> Router {
    Router::new()
        .nest("/api", billing_routes())
        .layer(axum::middleware::from_fn_with_state(validator, auth_middleware))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
