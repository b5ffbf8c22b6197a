//! Purchase command path: validation against downstream services and
//! durable command publication.
//!
//! The crate exposes three repository seams with a production and an
//! in-memory implementation each:
//! - [`AuthRepository`] — access-token verification
//! - [`ProductRepository`] — catalog validation and pricing
//! - [`PurchasingRepository`] — command publication to the event stream
//!
//! [`PurchasingService`] ties them together: cart validation happens
//! before any network call, the purchase total is derived from the
//! catalog's prices, and the validated aggregate is published exactly
//! once per successful call.

pub mod auth;
pub mod error;
pub mod product;
pub mod publisher;
pub mod service;

pub use auth::{AuthRepository, InMemoryAuthRepository, RemoteAuthRepository};
pub use error::PurchaseError;
pub use product::{InMemoryProductRepository, ProductRepository, RemoteProductRepository};
pub use publisher::{EventPublishingRepository, InMemoryPurchasingRepository, PurchasingRepository};
pub use service::PurchasingService;
