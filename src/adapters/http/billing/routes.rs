//! Axum router configuration for billing and content endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, check_content_access, download_content, get_checkout_status,
    get_creator_earnings, get_subscription, handle_stripe_webhook, list_purchases,
    start_purchase_checkout, start_subscription_checkout, BillingAppState,
};

/// Create the billing API router, to be nested under `/api`.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `POST /checkout/purchase` - Start a pack purchase checkout
/// - `POST /checkout/subscription` - Start a subscription checkout
/// - `GET /checkout/status/:session_id` - Poll and reconcile a checkout session
/// - `GET /subscription` - Subscription status
/// - `POST /subscription/cancel` - Cancel the active subscription
/// - `GET /purchases` - Purchase history
/// - `GET /content/:id/access` - Access decision
/// - `GET /content/:id/download` - Download the file
///
/// ## Creator Endpoints (require creator or admin role)
/// - `GET /creator/earnings` - Sales summary
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /webhooks/stripe` - Gateway webhook
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout/purchase", post(start_purchase_checkout))
        .route("/checkout/subscription", post(start_subscription_checkout))
        .route("/checkout/status/:session_id", get(get_checkout_status))
        .route("/subscription", get(get_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
        .route("/purchases", get(list_purchases))
        .route("/content/:id/access", get(check_content_access))
        .route("/content/:id/download", get(download_content))
        .route("/creator/earnings", get(get_creator_earnings))
        .nest("/webhooks", webhook_routes())
}

/// Webhook routes. Separate because they authenticate by signature, not session.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
