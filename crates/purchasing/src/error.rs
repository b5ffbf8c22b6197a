//! Errors of the purchase command path.

use messaging::MessagingError;
use resilience::CallError;
use thiserror::Error;

/// Errors surfaced by the purchasing service and its repositories.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// A cart item carried a non-positive amount. Rejected before any
    /// downstream call.
    #[error("invalid cart item amount")]
    InvalidCartItemAmount,

    /// The catalog reported a requested product as not found.
    #[error("product not found")]
    ProductNotFound,

    /// The catalog reported a status this gateway does not recognize.
    #[error("unknown product status")]
    UnknownProductStatus,

    /// A downstream call failed (throttled, circuit open, or transport
    /// exhausted). Callers should back off rather than retry blindly.
    #[error(transparent)]
    Remote(#[from] CallError),

    /// The broker did not accept the command.
    #[error(transparent)]
    Publish(#[from] MessagingError),

    /// A wire payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl PurchaseError {
    /// True when the failure stems from downstream unavailability rather
    /// than the request itself.
    pub fn is_unavailability(&self) -> bool {
        matches!(self, PurchaseError::Remote(_))
    }
}
