//! Integration tests for the gateway's HTTP surface.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::CustomerId;
use domain::{AuthResult, PurchaseResult, PurchaseStatus, PurchaseStep};
use futures_util::StreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{ResultCache, ResultFeed};
use purchasing::{
    InMemoryAuthRepository, InMemoryProductRepository, InMemoryPurchasingRepository,
    PurchasingService,
};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct Harness {
    app: axum::Router,
    auth: Arc<InMemoryAuthRepository>,
    products: Arc<InMemoryProductRepository>,
    publisher: Arc<InMemoryPurchasingRepository>,
    cache: Arc<ResultCache>,
    feed: ResultFeed,
}

fn setup() -> Harness {
    let auth = Arc::new(InMemoryAuthRepository::new());
    let products = Arc::new(InMemoryProductRepository::new());
    let publisher = Arc::new(InMemoryPurchasingRepository::new());
    let cache = Arc::new(ResultCache::new());
    let feed = ResultFeed::new();

    let purchasing = Arc::new(PurchasingService::new(
        Arc::clone(&products) as Arc<dyn purchasing::ProductRepository>,
        Arc::clone(&publisher) as Arc<dyn purchasing::PurchasingRepository>,
    ));
    let state = Arc::new(api::AppState::new(
        Arc::clone(&auth) as Arc<dyn purchasing::AuthRepository>,
        purchasing,
        Arc::clone(&cache),
        feed.clone(),
    ));
    let app = api::create_app(state, get_metrics_handle());

    Harness {
        app,
        auth,
        products,
        publisher,
        cache,
        feed,
    }
}

fn active_customer(id: u64) -> AuthResult {
    AuthResult {
        customer_id: CustomerId::new(id),
        active: true,
        expired: false,
    }
}

fn purchase_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/purchase")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn cart(product_id: u64, amount: i64) -> serde_json::Value {
    serde_json::json!({
        "cart_items": [{ "product_id": product_id, "amount": amount }],
        "currency_code": "NT"
    })
}

#[tokio::test]
async fn health_check() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn purchase_without_token_is_unauthorized() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(purchase_request(None, cart(1, 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.publisher.publish_count(), 0);
}

#[tokio::test]
async fn purchase_with_inactive_token_is_unauthorized() {
    let harness = setup();
    harness.auth.insert_token(
        "stale",
        AuthResult {
            customer_id: CustomerId::new(1),
            active: true,
            expired: true,
        },
    );

    let response = harness
        .app
        .oneshot(purchase_request(Some("stale"), cart(1, 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_purchase_is_accepted_and_published() {
    let harness = setup();
    harness.auth.insert_token("token-1", active_customer(42));
    harness.products.insert_product(common::ProductId::new(1), 100);

    let response = harness
        .app
        .oneshot(purchase_request(Some("token-1"), cart(1, 3)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["correlation_id"].as_str().is_some());

    let published = harness.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].order.customer_id, CustomerId::new(42));
    assert_eq!(published[0].payment.amount, 300);
}

#[tokio::test]
async fn non_positive_amount_is_rejected_before_any_call() {
    let harness = setup();
    harness.auth.insert_token("token-1", active_customer(1));

    let response = harness
        .app
        .oneshot(purchase_request(Some("token-1"), cart(1, 0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.products.call_count(), 0);
    assert_eq!(harness.publisher.publish_count(), 0);
}

#[tokio::test]
async fn missing_product_is_not_found_and_not_published() {
    let harness = setup();
    harness.auth.insert_token("token-1", active_customer(1));

    let response = harness
        .app
        .oneshot(purchase_request(Some("token-1"), cart(404, 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(harness.publisher.publish_count(), 0);
}

#[tokio::test]
async fn unsupported_currency_is_rejected() {
    let harness = setup();
    harness.auth.insert_token("token-1", active_customer(1));

    let body = serde_json::json!({
        "cart_items": [{ "product_id": 1, "amount": 1 }],
        "currency_code": "EUR"
    });
    let response = harness
        .app
        .oneshot(purchase_request(Some("token-1"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_outage_maps_to_service_unavailable() {
    let harness = setup();
    harness.auth.insert_token("token-1", active_customer(1));
    harness.auth.set_unavailable(true);

    let response = harness
        .app
        .oneshot(purchase_request(Some("token-1"), cart(1, 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn result_stream_replays_snapshot_and_pushes_updates() {
    let harness = setup();
    harness.auth.insert_token("token-1", active_customer(7));
    harness
        .cache
        .set(
            CustomerId::new(7),
            PurchaseResult {
                purchase_id: Some(11),
                step: PurchaseStep::CreateOrder,
                status: PurchaseStatus::Executing,
            },
        )
        .await
        .unwrap();

    let response = harness
        .app
        .oneshot(
            Request::builder()
                .uri("/api/purchase/result")
                .header("authorization", "Bearer token-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"))
    );

    let mut body = response.into_body().into_data_stream();

    // Snapshot frame arrives first.
    let snapshot = tokio::time::timeout(Duration::from_secs(1), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let snapshot = String::from_utf8(snapshot.to_vec()).unwrap();
    assert!(snapshot.contains("\"step\":\"create_order\""));
    assert!(snapshot.contains("\"status\":\"executing\""));

    // Then a live frame addressed to this customer.
    harness.feed.deliver(
        CustomerId::new(7),
        PurchaseResult {
            purchase_id: Some(11),
            step: PurchaseStep::CreatePayment,
            status: PurchaseStatus::Success,
        },
    );
    let update = tokio::time::timeout(Duration::from_secs(1), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let update = String::from_utf8(update.to_vec()).unwrap();
    assert!(update.contains("\"status\":\"success\""));
}

#[tokio::test]
async fn result_stream_requires_authentication() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(
            Request::builder()
                .uri("/api/purchase/result")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let harness = setup();

    let response = harness
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
