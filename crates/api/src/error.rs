//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use purchasing::PurchaseError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing, inactive, or expired credentials.
    Unauthorized,
    /// Resource not found.
    NotFound(String),
    /// A downstream dependency is unavailable (throttled, circuit open,
    /// or transport exhausted).
    Unavailable(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "request failed on downstream unavailability");
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        match &err {
            PurchaseError::InvalidCartItemAmount => ApiError::BadRequest(err.to_string()),
            // An unrecognized catalog status is a domain rejection of
            // the purchase, same as a missing product.
            PurchaseError::ProductNotFound | PurchaseError::UnknownProductStatus => {
                ApiError::NotFound(err.to_string())
            }
            PurchaseError::Remote(_) => ApiError::Unavailable(err.to_string()),
            PurchaseError::Publish(_) | PurchaseError::Codec(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resilience::CallError;

    #[test]
    fn purchase_errors_map_to_statuses() {
        let cases = [
            (
                ApiError::from(PurchaseError::InvalidCartItemAmount),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(PurchaseError::ProductNotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(PurchaseError::UnknownProductStatus),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(PurchaseError::Remote(CallError::Throttled {
                    service: "product".to_string(),
                })),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
