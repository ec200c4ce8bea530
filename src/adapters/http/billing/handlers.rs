//! HTTP handlers for checkout, subscription, purchase, and content endpoints.
//!
//! These handlers connect axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::billing::{
    ApplyObservedStatusHandler, AuthorizeContentHandler, AuthorizeContentQuery, BillingPolicy,
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckoutIntent, DownloadContentHandler,
    DownloadContentQuery, GetCreatorEarningsHandler, GetCreatorEarningsQuery,
    GetPaymentStatusHandler, GetPaymentStatusQuery, GetSubscriptionStatusHandler,
    GetSubscriptionStatusQuery, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    ListPurchasesHandler, ListPurchasesQuery, StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::billing::{AccessPurpose, BillingError};
use crate::domain::foundation::{CheckoutSessionId, ContentId};
use crate::ports::{
    ContentCatalog, ContentStorage, DownloadLog, PaymentGateway, PurchaseRepository,
    SubscriptionRepository, TransactionRepository,
};

use super::dto::{
    AccessResponse, CheckoutResponse, EarningsResponse, ErrorResponse, PaymentStatusResponse,
    PurchaseCheckoutRequest, PurchaseListResponse, PurchaseView, SubscriptionStatusResponse,
    SubscriptionView, WebhookResponse,
};

/// Header the gateway signs webhook payloads with.
const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; handlers are built on demand from the Arc-wrapped ports.
#[derive(Clone)]
pub struct BillingAppState {
    pub catalog: Arc<dyn ContentCatalog>,
    pub download_log: Arc<dyn DownloadLog>,
    pub storage: Arc<dyn ContentStorage>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub policy: BillingPolicy,
    /// Frontend origin used for checkout redirects.
    pub public_url: String,
    /// Other frontend origins a checkout may redirect back to.
    pub allowed_origins: Vec<String>,
}

impl BillingAppState {
    fn reconciler(&self) -> ApplyObservedStatusHandler {
        ApplyObservedStatusHandler::new(
            self.transactions.clone(),
            self.policy.subscription_period_days,
        )
    }

    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.catalog.clone(),
            self.transactions.clone(),
            self.subscriptions.clone(),
            self.gateway.clone(),
            self.policy.clone(),
        )
    }

    pub fn payment_status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(
            self.transactions.clone(),
            self.gateway.clone(),
            self.reconciler(),
        )
    }

    pub fn webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(self.gateway.clone(), self.reconciler())
    }

    pub fn subscription_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.subscriptions.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.subscriptions.clone())
    }

    pub fn list_purchases_handler(&self) -> ListPurchasesHandler {
        ListPurchasesHandler::new(self.purchases.clone())
    }

    pub fn access_gate(&self) -> AuthorizeContentHandler {
        AuthorizeContentHandler::new(
            self.catalog.clone(),
            self.purchases.clone(),
            self.subscriptions.clone(),
            self.download_log.clone(),
        )
    }

    pub fn download_handler(&self) -> DownloadContentHandler {
        DownloadContentHandler::new(self.access_gate(), self.storage.clone())
    }

    pub fn earnings_handler(&self) -> GetCreatorEarningsHandler {
        GetCreatorEarningsHandler::new(
            self.catalog.clone(),
            self.purchases.clone(),
            self.download_log.clone(),
        )
    }

    fn origin(&self, headers: &HeaderMap) -> String {
        redirect_origin(headers, &self.public_url, &self.allowed_origins)
    }
}

/// Redirect origin for checkout: the caller's `Origin` header when it is a
/// known frontend, else `public_url`.
fn redirect_origin(headers: &HeaderMap, public_url: &str, allowed: &[String]) -> String {
    let known = |origin: &str| {
        origin == public_url.trim_end_matches('/')
            || allowed
                .iter()
                .any(|a| a.trim_end_matches('/') == origin)
    };

    match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) if known(origin) => origin.to_string(),
        Some(origin) => {
            tracing::warn!(origin = %origin, "Ignoring unknown Origin for checkout redirect");
            public_url.to_string()
        }
        None => public_url.to_string(),
    }
}

fn parse_content_id(raw: String) -> Result<ContentId, BillingApiError> {
    ContentId::new(raw).map_err(|e| BillingError::invalid_request(e.to_string()).into())
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout/purchase - Start a pack purchase checkout
pub async fn start_purchase_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Json(request): Json<PurchaseCheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let content_id = parse_content_id(request.content_id)?;
    let cmd = StartCheckoutCommand {
        user,
        intent: CheckoutIntent::Purchase { content_id },
        origin: state.origin(&headers),
    };

    let result = state.start_checkout_handler().handle(cmd).await?;

    Ok(Json(CheckoutResponse {
        url: result.redirect_url,
        session_id: result.session_id.to_string(),
    }))
}

/// POST /api/checkout/subscription - Start a subscription checkout
pub async fn start_subscription_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = StartCheckoutCommand {
        user,
        intent: CheckoutIntent::Subscription,
        origin: state.origin(&headers),
    };

    let result = state.start_checkout_handler().handle(cmd).await?;

    Ok(Json(CheckoutResponse {
        url: result.redirect_url,
        session_id: result.session_id.to_string(),
    }))
}

/// GET /api/checkout/status/:session_id - Poll a checkout session
pub async fn get_checkout_status(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let session_id = CheckoutSessionId::new(session_id)
        .map_err(|e| BillingError::invalid_request(e.to_string()))?;

    let result = state
        .payment_status_handler()
        .handle(GetPaymentStatusQuery { user, session_id })
        .await?;

    Ok(Json(PaymentStatusResponse::from(result)))
}

/// POST /api/webhooks/stripe - Handle gateway webhook events
///
/// Unknown sessions and unrelated events are acknowledged with 200 so the
/// gateway stops retrying. A bad signature answers 400.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let disposition = state.webhook_handler().handle(cmd).await?;

    Ok(Json(WebhookResponse::from(disposition)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription & purchases
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscription - Current subscription status
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .subscription_status_handler()
        .handle(GetSubscriptionStatusQuery { user_id: user.id })
        .await?;

    Ok(Json(SubscriptionStatusResponse {
        is_subscribed: result.is_subscribed,
        subscription: result.subscription.map(SubscriptionView::from),
    }))
}

/// POST /api/subscription/cancel - Cancel the active subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { user_id: user.id })
        .await?;

    Ok(Json(SubscriptionStatusResponse {
        is_subscribed: false,
        subscription: Some(SubscriptionView::from(result.subscription)),
    }))
}

/// GET /api/purchases - Purchase history, newest first
pub async fn list_purchases(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .list_purchases_handler()
        .handle(ListPurchasesQuery { user_id: user.id })
        .await?;

    Ok(Json(PurchaseListResponse {
        purchases: result.purchases.into_iter().map(PurchaseView::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Content
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/content/:id/access - Can the caller download this item?
pub async fn check_content_access(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = AuthorizeContentQuery {
        user_id: user.id,
        content_id: parse_content_id(content_id)?,
        purpose: AccessPurpose::Preview,
    };

    let result = state.access_gate().handle(query).await?;

    Ok(Json(AccessResponse::from(result.decision)))
}

/// GET /api/content/:id/download - Stream the file as an attachment
pub async fn download_content(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(content_id): Path<String>,
) -> Result<Response, BillingApiError> {
    let query = DownloadContentQuery {
        user_id: user.id,
        content_id: parse_content_id(content_id)?,
    };

    let result = state.download_handler().handle(query).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        result.filename.replace(['"', '\\'], "_")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(result.media_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(result.content.reader)),
    )
        .into_response();
    if let Some(len) = result.content.len {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok(response)
}

/// GET /api/creator/earnings - Sales summary for the calling creator
pub async fn get_creator_earnings(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let earnings = state
        .earnings_handler()
        .handle(GetCreatorEarningsQuery { user })
        .await?;

    Ok(Json(EarningsResponse::from(earnings)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for BillingApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(BillingError::from(err))
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            BillingError::Conflict { .. } => StatusCode::CONFLICT,
            BillingError::UnknownSession(_) => StatusCode::NOT_FOUND,
            BillingError::InvalidSignature { .. } => StatusCode::BAD_REQUEST,
            BillingError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            BillingError::NoEntitlement(_) => StatusCode::FORBIDDEN,
            BillingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::Storage(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let message = match &self.0 {
            // Store and filesystem details stay in the logs
            BillingError::Storage(_) | BillingError::Infrastructure(_) => {
                "Internal server error".to_string()
            }
            other => other.message(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}
