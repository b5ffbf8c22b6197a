//! Resilient remote-call facade for downstream services.
//!
//! Wraps a single logical remote procedure call with, outermost first:
//!
//! 1. [`RateLimiter`] — token bucket; an exhausted bucket fails the call
//!    immediately instead of queuing.
//! 2. [`CircuitBreaker`] — fails fast while the downstream is considered
//!    unavailable.
//! 3. [`Channel`] — connection-level concerns: endpoint resolution,
//!    round-robin balancing, keep-alive probing, and retry with jittered
//!    linear backoff for transient error classes only.
//!
//! The composition lives in [`ResilientClient`], an explicit, injected
//! object: its limiter and breaker state are shared by every caller that
//! holds a clone, with their own internal synchronization. There are no
//! process globals.

pub mod circuit_breaker;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{Channel, ChannelConfig, KeepAliveConfig, ResilientClient, Transport};
pub use endpoint::{Endpoint, Endpoints, RegistryResolver, Resolver, StaticResolver};
pub use error::{CallError, TransportError};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;

/// A request handed to the transport: logical service, method, and an
/// already-encoded payload.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Logical service name, e.g. `"product.ProductService"`.
    pub service: String,
    /// Method on that service, e.g. `"CheckProducts"`.
    pub method: String,
    /// Encoded request body.
    pub payload: Vec<u8>,
}

impl CallRequest {
    /// Creates a call request.
    pub fn new(service: impl Into<String>, method: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            payload,
        }
    }
}

/// An encoded response returned by the transport.
#[derive(Debug, Clone)]
pub struct CallResponse {
    /// Encoded response body.
    pub payload: Vec<u8>,
}
