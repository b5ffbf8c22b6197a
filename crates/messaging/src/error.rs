//! Messaging error types.

use thiserror::Error;

/// Errors from the event-stream layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    /// Could not connect to the broker.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// The broker did not durably accept a message.
    #[error("publish to '{topic}' failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    /// A subscription could not be established.
    #[error("subscribe to '{topic}' failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    /// The delivery stream ended unexpectedly.
    #[error("subscription to '{topic}' closed")]
    Closed { topic: String },
}
