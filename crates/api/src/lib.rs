//! HTTP surface of the purchase gateway.
//!
//! Exposes the purchase command endpoint and the live result stream
//! behind bearer-token authentication, plus health and Prometheus
//! metrics endpoints, with structured logging on every request.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod transport;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{ResultCache, ResultFeed};
use purchasing::{AuthRepository, PurchasingService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use transport::HttpTransport;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub auth: Arc<dyn AuthRepository>,
    pub purchasing: Arc<PurchasingService>,
    pub cache: Arc<ResultCache>,
    pub feed: ResultFeed,
}

impl AppState {
    /// Bundles the gateway's collaborators into shared state.
    pub fn new(
        auth: Arc<dyn AuthRepository>,
        purchasing: Arc<PurchasingService>,
        cache: Arc<ResultCache>,
        feed: ResultFeed,
    ) -> Self {
        Self {
            auth,
            purchasing,
            cache,
            feed,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let protected = Router::new()
        .route("/api/purchase", post(routes::purchase::create))
        .route("/api/purchase/result", get(routes::purchase::results))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(protected)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
