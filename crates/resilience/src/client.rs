//! The channel and the composed resilient client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::endpoint::{Endpoint, Endpoints, Resolver};
use crate::error::{CallError, TransportError};
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::circuit_breaker::CircuitBreaker;
use crate::{CallRequest, CallResponse};

/// Pluggable wire transport for one remote call.
///
/// Implementations carry the actual protocol; the channel adds endpoint
/// selection, retry, and liveness probing on top.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Executes one call against a specific endpoint.
    async fn call(
        &self,
        endpoint: &Endpoint,
        request: CallRequest,
    ) -> Result<CallResponse, TransportError>;

    /// Liveness probe, independent of call traffic.
    async fn ping(&self, endpoint: &Endpoint) -> Result<(), TransportError>;
}

/// Keep-alive probing parameters.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// How often to probe when there is no call activity.
    pub interval: Duration,
    /// How long to wait for a probe ack before considering the
    /// connection dead.
    pub timeout: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Channel construction parameters.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bound on connection bootstrap, resolution included.
    pub connect_timeout: Duration,
    /// Connection-level retry budget.
    pub retry: RetryPolicy,
    /// Keep-alive probing; `None` disables it.
    pub keep_alive: Option<KeepAliveConfig>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            keep_alive: Some(KeepAliveConfig::default()),
        }
    }
}

struct KeepAliveGuard {
    handle: JoinHandle<()>,
}

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Long-lived, shared connection to one downstream service.
///
/// Resolves the target once at connect time, balances calls round-robin
/// across the resolved endpoints, retries transient failures with
/// jittered linear backoff, and probes liveness in the background.
#[derive(Clone)]
pub struct Channel<T: Transport> {
    transport: Arc<T>,
    endpoints: Endpoints,
    retry: RetryPolicy,
    _keep_alive: Option<Arc<KeepAliveGuard>>,
}

impl<T: Transport> Channel<T> {
    /// Establishes a channel to `target`, resolving it through the given
    /// strategy. Bounded by `config.connect_timeout`.
    pub async fn connect(
        resolver: &dyn Resolver,
        target: &str,
        transport: Arc<T>,
        config: ChannelConfig,
    ) -> Result<Self, TransportError> {
        let resolved = tokio::time::timeout(config.connect_timeout, resolver.resolve(target))
            .await
            .map_err(|_| TransportError::DeadlineExceeded)??;

        tracing::info!(target, endpoints = resolved.len(), "channel connected");
        let endpoints = Endpoints::new(resolved);

        let keep_alive = config.keep_alive.map(|ka| {
            let transport = Arc::clone(&transport);
            let endpoints = endpoints.clone();
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(ka.interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let endpoint = endpoints.pick().clone();
                    match tokio::time::timeout(ka.timeout, transport.ping(&endpoint)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            tracing::warn!(%endpoint, error = %err, "keep-alive probe failed");
                        }
                        Err(_) => {
                            tracing::warn!(%endpoint, "keep-alive probe timed out");
                        }
                    }
                }
            });
            Arc::new(KeepAliveGuard { handle })
        });

        Ok(Self {
            transport,
            endpoints,
            retry: config.retry,
            _keep_alive: keep_alive,
        })
    }

    /// Executes a call, retrying transient failures up to the budget.
    ///
    /// Each attempt goes to the next round-robin endpoint. Application
    /// rejections are returned immediately.
    pub async fn call(&self, request: CallRequest) -> Result<CallResponse, TransportError> {
        let mut attempt = 1;
        loop {
            let endpoint = self.endpoints.pick().clone();
            match self.transport.call(&endpoint, request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    let wait = self.retry.backoff(attempt);
                    tracing::debug!(
                        %endpoint,
                        error = %err,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "transient transport error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Remote-call facade composing rate limiting, circuit breaking, and the
/// retrying channel, in that fixed order.
///
/// One client guards one downstream service. It is cheap to clone; all
/// clones share the same limiter bucket and breaker state machine, so
/// every concurrent caller observes the same policy decisions.
#[derive(Clone)]
pub struct ResilientClient<T: Transport> {
    name: String,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    channel: Channel<T>,
}

impl<T: Transport> ResilientClient<T> {
    /// Composes a client around an established channel.
    pub fn new(
        name: impl Into<String>,
        limiter: RateLimiter,
        breaker: CircuitBreaker,
        channel: Channel<T>,
    ) -> Self {
        Self {
            name: name.into(),
            limiter,
            breaker,
            channel,
        }
    }

    /// Executes one guarded remote call.
    ///
    /// Fails immediately with [`CallError::Throttled`] when no rate
    /// token is available and with [`CallError::CircuitOpen`] while the
    /// breaker holds calls back; neither contacts the network.
    pub async fn call(&self, request: CallRequest) -> Result<CallResponse, CallError> {
        if !self.limiter.try_acquire().await {
            metrics::counter!("remote_calls_total", "service" => self.name.clone(), "outcome" => "throttled").increment(1);
            return Err(CallError::Throttled {
                service: self.name.clone(),
            });
        }

        if !self.breaker.allow().await {
            metrics::counter!("remote_calls_total", "service" => self.name.clone(), "outcome" => "circuit_open").increment(1);
            return Err(CallError::CircuitOpen {
                service: self.name.clone(),
            });
        }

        match self.channel.call(request).await {
            Ok(response) => {
                self.breaker.record_success().await;
                metrics::counter!("remote_calls_total", "service" => self.name.clone(), "outcome" => "ok").increment(1);
                Ok(response)
            }
            Err(err) => {
                self.breaker.record_failure().await;
                metrics::counter!("remote_calls_total", "service" => self.name.clone(), "outcome" => "error").increment(1);
                tracing::warn!(service = %self.name, error = %err, "remote call failed");
                Err(CallError::Transport(err))
            }
        }
    }
}
