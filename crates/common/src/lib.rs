//! Shared identifier types used across the purchase gateway.

pub mod types;

pub use types::{CorrelationId, CustomerId, ProductId};
