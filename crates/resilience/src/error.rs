//! Error taxonomy of the remote-call facade.

use thiserror::Error;

/// Errors produced by the transport layer.
///
/// [`TransportError::is_transient`] decides retry eligibility: only
/// conditions that can heal on their own (propagation lag, aborted
/// calls, momentary unavailability) are retried. Application-level
/// rejections are never retried — retrying them would risk duplicate
/// side effects downstream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The remote entity was not found; often propagation lag.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call was aborted mid-flight.
    #[error("aborted: {0}")]
    Aborted(String),

    /// No endpoint could be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The downstream rejected the request at the application level.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Name resolution produced no endpoints.
    #[error("resolution failed for {target}: {reason}")]
    Resolution { target: String, reason: String },
}

impl TransportError {
    /// Whether the connection-level retry may re-attempt this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::NotFound(_) | TransportError::Aborted(_))
    }
}

/// Errors surfaced to callers of [`crate::ResilientClient`].
///
/// None of these are retried above the facade; `Throttled` and
/// `CircuitOpen` signal infrastructure pressure the caller should back
/// off from, distinct from a downstream fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// The rate limiter had no token available.
    #[error("call to {service} throttled")]
    Throttled { service: String },

    /// The circuit breaker is open; the network was not contacted.
    #[error("circuit breaker for {service} is open")]
    CircuitOpen { service: String },

    /// The transport failed after its retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CallError {
    /// True for throttled/circuit-open conditions, where backing off is
    /// more appropriate than retrying identically.
    pub fn is_backpressure(&self) -> bool {
        matches!(
            self,
            CallError::Throttled { .. } | CallError::CircuitOpen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(TransportError::NotFound("p".into()).is_transient());
        assert!(TransportError::Aborted("a".into()).is_transient());
        assert!(!TransportError::Rejected("invalid".into()).is_transient());
        assert!(!TransportError::Unavailable("down".into()).is_transient());
        assert!(!TransportError::DeadlineExceeded.is_transient());
    }

    #[test]
    fn backpressure_classification() {
        assert!(
            CallError::Throttled {
                service: "auth".into()
            }
            .is_backpressure()
        );
        assert!(
            CallError::CircuitOpen {
                service: "auth".into()
            }
            .is_backpressure()
        );
        assert!(!CallError::Transport(TransportError::DeadlineExceeded).is_backpressure());
    }
}
