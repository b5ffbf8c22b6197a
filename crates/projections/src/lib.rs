//! Result projection for the purchase gateway.
//!
//! Consumes `purchase.result` events and materializes them two ways:
//! - [`ResultCache`] — the latest result per customer, retained for a
//!   sliding time-to-live, for snapshot reads
//! - [`ResultFeed`] — live fan-out to connections currently streaming a
//!   customer's results
//!
//! [`ResultIngestor`] runs the consumer workers; [`ResultProjection`]
//! holds the apply logic shared by all of them.

pub mod cache;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod projection;

pub use cache::{DEFAULT_RESULT_TTL, ResultCache, ResultStore};
pub use error::ProjectionError;
pub use feed::{ResultFeed, ResultSubscription};
pub use ingest::ResultIngestor;
pub use projection::ResultProjection;
