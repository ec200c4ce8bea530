//! HTTP-level tests for the billing API.
//!
//! Requests go through the full router (session middleware, extractors,
//! error mapping) with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sounddrops::adapters::auth::MockSessionValidator;
use sounddrops::adapters::http::{app_router, BillingAppState};
use sounddrops::adapters::memory::{InMemoryContentCatalog, InMemoryEntitlementStore};
use sounddrops::adapters::storage::InMemoryContentStorage;
use sounddrops::adapters::stripe::MockPaymentGateway;
use sounddrops::application::handlers::billing::BillingPolicy;
use sounddrops::domain::billing::{ContentItem, FileKind, PaymentStatus};
use sounddrops::domain::foundation::{CheckoutSessionId, ContentId, Role, UserId};

// =============================================================================
// Test Infrastructure
// =============================================================================

const BUYER: &str = "tok_buyer";
const OTHER: &str = "tok_other";
const CREATOR: &str = "tok_creator";

struct TestApi {
    router: Router,
    gateway: MockPaymentGateway,
    storage: InMemoryContentStorage,
}

async fn api() -> TestApi {
    let store = InMemoryEntitlementStore::new();
    let catalog = InMemoryContentCatalog::new();
    let storage = InMemoryContentStorage::new();
    let gateway = MockPaymentGateway::new();

    catalog
        .add_item(ContentItem {
            id: ContentId::new("pack_drums").unwrap(),
            title: "Dusty Drums".to_string(),
            owner_id: UserId::new("creator").unwrap(),
            is_free: false,
            price_cents: 499,
            storage_ref: "drums.zip".to_string(),
            file_kind: FileKind::Zip,
            download_count: 0,
        })
        .await;
    catalog
        .add_item(ContentItem {
            id: ContentId::new("pack_free").unwrap(),
            title: "Free Hat".to_string(),
            owner_id: UserId::new("creator").unwrap(),
            is_free: true,
            price_cents: 0,
            storage_ref: "hat.mp3".to_string(),
            file_kind: FileKind::Audio,
            download_count: 0,
        })
        .await;
    storage.put("drums.zip", b"PK zip bytes".to_vec()).await;
    storage.put("hat.mp3", b"ID3 hat".to_vec()).await;

    let validator = MockSessionValidator::new()
        .with_test_user(BUYER, "buyer", Role::User)
        .with_test_user(OTHER, "other", Role::User)
        .with_test_user(CREATOR, "creator", Role::Creator);

    let state = BillingAppState {
        catalog: Arc::new(catalog.clone()),
        download_log: Arc::new(catalog),
        storage: Arc::new(storage.clone()),
        transactions: Arc::new(store.clone()),
        purchases: Arc::new(store.clone()),
        subscriptions: Arc::new(store),
        gateway: Arc::new(gateway.clone()),
        policy: BillingPolicy::default(),
        public_url: "https://sounddrops.test".to_string(),
        allowed_origins: vec!["http://localhost:5173".to_string()],
    };

    TestApi {
        router: app_router(state, Arc::new(validator)),
        gateway,
        storage,
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook(payload: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/api/webhooks/stripe");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    builder.body(Body::from(payload)).unwrap()
}

async fn send(api: &TestApi, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = api.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(api: &TestApi, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(api, request).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn buy_drums(api: &TestApi, token: &str) -> CheckoutSessionId {
    let (status, body) = send_json(
        api,
        post_json("/api/checkout/purchase", token, json!({ "content_id": "pack_drums" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    CheckoutSessionId::new(body["session_id"].as_str().unwrap()).unwrap()
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn health_needs_no_auth() {
    let api = api().await;
    let (status, body) = send_json(&api, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let api = api().await;
    let (status, body) = send_json(&api, get("/api/subscription", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_token_is_401() {
    let api = api().await;
    let (status, _) = send_json(&api, get("/api/subscription", Some("tok_bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Checkout and webhook
// =============================================================================

#[tokio::test]
async fn purchase_checkout_returns_redirect() {
    let api = api().await;
    let (status, body) = send_json(
        &api,
        post_json("/api/checkout/purchase", BUYER, json!({ "content_id": "pack_drums" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().starts_with("https://checkout.mock/pay/"));
    assert!(body["session_id"].as_str().unwrap().starts_with("cs_mock_"));

    let requests = api.gateway.checkout_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_cents, 499);
    assert!(requests[0]
        .success_url
        .starts_with("https://sounddrops.test/purchase-success"));
}

#[tokio::test]
async fn checkout_redirects_only_to_known_origins() {
    let api = api().await;
    for origin in ["http://localhost:5173", "https://evil.example"] {
        let mut request =
            post_json("/api/checkout/purchase", BUYER, json!({ "content_id": "pack_drums" }));
        request
            .headers_mut()
            .insert(header::ORIGIN, origin.parse().unwrap());
        let (status, _) = send(&api, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    let requests = api.gateway.checkout_requests();
    assert!(requests[0]
        .success_url
        .starts_with("http://localhost:5173/purchase-success"));
    assert!(requests[1]
        .success_url
        .starts_with("https://sounddrops.test/purchase-success"));
    assert_eq!(requests[1].cancel_url, "https://sounddrops.test/browse");
}

#[tokio::test]
async fn checkout_of_missing_pack_is_404() {
    let api = api().await;
    let (status, body) = send_json(
        &api,
        post_json("/api/checkout/purchase", BUYER, json!({ "content_id": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CONTENT_NOT_FOUND");
}

#[tokio::test]
async fn webhook_without_signature_is_400() {
    let api = api().await;
    let session_id = buy_drums(&api, BUYER).await;
    let payload = MockPaymentGateway::webhook_payload(&session_id, PaymentStatus::Paid, Some(499));

    let (status, body) = send_json(&api, webhook(payload, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_WEBHOOK_SIGNATURE");
}

#[tokio::test]
async fn webhook_for_unknown_session_is_acknowledged() {
    let api = api().await;
    let payload = MockPaymentGateway::webhook_payload(
        &CheckoutSessionId::new("cs_elsewhere").unwrap(),
        PaymentStatus::Paid,
        Some(100),
    );

    let (status, body) = send_json(&api, webhook(payload, Some("t=1,v1=ok"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unknown_session");
}

#[tokio::test]
async fn unrelated_webhook_is_ignored() {
    let api = api().await;
    let payload = MockPaymentGateway::unrelated_webhook_payload("customer.created");

    let (status, body) = send_json(&api, webhook(payload, Some("t=1,v1=ok"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn paid_purchase_unlocks_download() {
    let api = api().await;
    let session_id = buy_drums(&api, BUYER).await;

    let (status, _) = send(&api, get("/api/content/pack_drums/download", Some(BUYER))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let payload = MockPaymentGateway::webhook_payload(&session_id, PaymentStatus::Paid, Some(499));
    let (status, body) = send_json(&api, webhook(payload, Some("t=1,v1=ok"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "paid");

    let (status, body) =
        send_json(&api, get("/api/content/pack_drums/access", Some(BUYER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "allowed": true, "reason": "purchased" }));

    let response = api
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/content/pack_drums/download")
                .header(header::COOKIE, format!("session_token={}", BUYER))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response_len = response.headers()[header::CONTENT_LENGTH].clone();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Dusty Drums.zip\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"PK zip bytes");
    assert_eq!(response_len, "12");

    let (status, body) = send_json(&api, get("/api/purchases", Some(BUYER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purchases"].as_array().unwrap().len(), 1);
    assert_eq!(body["purchases"][0]["content_id"], "pack_drums");
}

#[tokio::test]
async fn large_pack_download_arrives_intact() {
    let api = api().await;
    let archive: Vec<u8> = (0..1_000_000u32).map(|i| (i % 253) as u8).collect();
    api.storage.put("drums.zip", archive.clone()).await;

    let session_id = buy_drums(&api, BUYER).await;
    let payload = MockPaymentGateway::webhook_payload(&session_id, PaymentStatus::Paid, Some(499));
    let (status, _) = send(&api, webhook(payload, Some("t=1,v1=ok"))).await;
    assert_eq!(status, StatusCode::OK);

    let response = api
        .router
        .clone()
        .oneshot(get("/api/content/pack_drums/download", Some(BUYER)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        archive.len().to_string().as_str()
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.len(), archive.len());
    assert_eq!(&bytes[..], &archive[..]);
}

#[tokio::test]
async fn poll_reports_gateway_and_local_status() {
    let api = api().await;
    let session_id = buy_drums(&api, BUYER).await;
    api.gateway.mark_paid(&session_id);

    let uri = format!("/api/checkout/status/{}", session_id);
    let (status, body) = send_json(&api, get(&uri, Some(BUYER))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complete");
    assert_eq!(body["payment_status"], "paid");
    assert_eq!(body["amount_total"], 499);
}

#[tokio::test]
async fn polling_someone_elses_session_is_404() {
    let api = api().await;
    let session_id = buy_drums(&api, BUYER).await;

    let uri = format!("/api/checkout/status/{}", session_id);
    let (status, body) = send_json(&api, get(&uri, Some(OTHER))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "UNKNOWN_SESSION");
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn subscription_lifecycle_over_http() {
    let api = api().await;

    let (status, body) = send_json(&api, get("/api/subscription", Some(BUYER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_subscribed"], false);

    let (status, body) =
        send_json(&api, post_json("/api/checkout/subscription", BUYER, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = CheckoutSessionId::new(body["session_id"].as_str().unwrap()).unwrap();

    let payload = MockPaymentGateway::webhook_payload(&session_id, PaymentStatus::Paid, Some(500));
    let (status, _) = send_json(&api, webhook(payload, Some("t=1,v1=ok"))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send_json(&api, get("/api/subscription", Some(BUYER))).await;
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["subscription"]["status"], "active");

    let (status, body) =
        send_json(&api, post_json("/api/checkout/subscription", BUYER, json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SUBSCRIPTION_ACTIVE");

    let (status, body) =
        send_json(&api, post_json("/api/subscription/cancel", BUYER, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription"]["status"], "cancelled");

    let (status, body) =
        send_json(&api, post_json("/api/subscription/cancel", BUYER, json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SUBSCRIPTION_NOT_FOUND");
}

// =============================================================================
// Content and earnings
// =============================================================================

#[tokio::test]
async fn free_pack_access_is_allowed() {
    let api = api().await;
    let (status, body) =
        send_json(&api, get("/api/content/pack_free/access", Some(OTHER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "allowed": true, "reason": "free_content" }));
}

#[tokio::test]
async fn earnings_require_creator_role() {
    let api = api().await;

    let (status, body) = send_json(&api, get("/api/creator/earnings", Some(BUYER))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let session_id = buy_drums(&api, BUYER).await;
    let payload = MockPaymentGateway::webhook_payload(&session_id, PaymentStatus::Paid, Some(499));
    send_json(&api, webhook(payload, Some("t=1,v1=ok"))).await;

    let (status, body) = send_json(&api, get("/api/creator/earnings", Some(CREATOR))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_packs"], 2);
    assert_eq!(body["total_sales"], 1);
    assert_eq!(body["total_revenue"], 499);
    assert_eq!(body["platform_fee"], 49);
    assert_eq!(body["creator_earnings"], 450);
}
