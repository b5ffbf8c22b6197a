//! Purchase creation and live result streaming.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use common::{CustomerId, ProductId};
use domain::{CartItem, PurchaseResult, PurchaseStatus, PurchaseStep};
use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

const SUPPORTED_CURRENCIES: [&str; 2] = ["NT", "US"];

// -- Request types --

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub cart_items: Vec<CartItemRequest>,
    pub currency_code: String,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: u64,
    pub amount: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct PurchaseAccepted {
    pub correlation_id: String,
}

/// One SSE frame: the purchase's latest progress plus emission time.
#[derive(Serialize)]
pub struct ResultFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_id: Option<u64>,
    pub step: PurchaseStep,
    pub status: PurchaseStatus,
    pub timestamp: DateTime<Utc>,
}

impl ResultFrame {
    fn now(result: PurchaseResult) -> Self {
        Self {
            purchase_id: result.purchase_id,
            step: result.step,
            status: result.status,
            timestamp: Utc::now(),
        }
    }
}

// -- Handlers --

/// POST /api/purchase — validate the cart and enqueue the purchase.
///
/// Returns 201 with the correlation id once the command is durably
/// accepted; the business outcome arrives later over the result stream.
#[tracing::instrument(skip(state, req), fields(%customer_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(customer_id): Extension<CustomerId>,
    Json(req): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseAccepted>), ApiError> {
    if req.cart_items.is_empty() {
        return Err(ApiError::BadRequest("cart is empty".to_string()));
    }
    if !SUPPORTED_CURRENCIES.contains(&req.currency_code.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "unsupported currency code: {}",
            req.currency_code
        )));
    }

    let cart_items: Vec<CartItem> = req
        .cart_items
        .iter()
        .map(|item| CartItem::new(ProductId::new(item.product_id), item.amount))
        .collect();

    let correlation_id = state
        .purchasing
        .create_purchase(customer_id, cart_items, req.currency_code)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseAccepted {
            correlation_id: correlation_id.to_string(),
        }),
    ))
}

/// GET /api/purchase/result — SSE stream of this customer's results.
///
/// Emits the cached snapshot first when one exists, then one frame per
/// update addressed to the authenticated customer. Other customers'
/// results never appear on this stream.
#[tracing::instrument(skip(state), fields(%customer_id))]
pub async fn results(
    State(state): State<Arc<AppState>>,
    Extension(customer_id): Extension<CustomerId>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let snapshot = state.cache.get(customer_id).await;
    let live = state.feed.attach(customer_id);
    metrics::counter!("result_streams_opened_total").increment(1);

    let stream = futures_util::stream::iter(snapshot)
        .chain(live)
        .map(|result| Event::default().event("result").json_data(ResultFrame::now(result)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
