//! Projection error types.

use messaging::MessagingError;
use thiserror::Error;

/// Errors from the result-projection pipeline.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The result cache rejected a write. Unlike a malformed payload,
    /// this is not safe to swallow: the event would be silently lost.
    #[error("cache write failed: {0}")]
    CacheWrite(String),

    /// The result subscription could not be established or ended.
    #[error(transparent)]
    Subscription(#[from] MessagingError),
}
