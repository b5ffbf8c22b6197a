//! Domain model for the purchase gateway.
//!
//! This crate holds the request-scoped purchase aggregate, the result
//! event observed from the saga orchestrator, and the wire schemas used
//! on the event stream:
//! - [`CartItem`], [`ProductStatus`], [`Purchase`] — the command side
//! - [`PurchaseResult`], [`PurchaseStep`], [`PurchaseStatus`] — the
//!   result side, with explicit `Unknown` variants for forward
//!   compatibility
//! - [`wire`] — serialized command/event layouts and lenient decoding

pub mod model;
pub mod result;
pub mod wire;

pub use model::{AuthResult, CartItem, Order, Payment, ProductCondition, ProductStatus, Purchase};
pub use result::{PurchaseResult, PurchaseStatus, PurchaseStep};
