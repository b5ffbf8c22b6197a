//! Circuit breaker with a trailing failure-ratio window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed,
    /// Failing fast; the network is not contacted.
    Open,
    /// One trial call is allowed through to probe recovery.
    HalfOpen,
}

/// Breaker tuning.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure ratio over the trailing window that trips the breaker.
    pub failure_ratio: f64,
    /// Minimum requests in the window before the ratio is considered.
    pub min_requests: u32,
    /// Length of the trailing counting window while closed.
    pub window: Duration,
    /// Cool-down spent open before allowing a trial call.
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_ratio: 0.6,
            min_requests: 5,
            window: Duration::from_secs(60),
            cool_down: Duration::from_secs(60),
        }
    }
}

struct BreakerState {
    state: CircuitState,
    window_start: Instant,
    requests: u32,
    failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl BreakerState {
    fn reset_window(&mut self, now: Instant) {
        self.window_start = now;
        self.requests = 0;
        self.failures = 0;
    }
}

/// Shared three-state circuit breaker.
///
/// Closed→Open when the failure ratio over the trailing window exceeds
/// the configured threshold (given enough requests); Open→HalfOpen after
/// the cool-down; HalfOpen admits exactly one trial call — its success
/// closes the breaker, its failure reopens it.
///
/// Cloning shares the state machine: all concurrent callers observe and
/// transition the same breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    /// Creates a breaker named after the downstream it guards.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window_start: Instant::now(),
                requests: 0,
                failures: 0,
                opened_at: None,
                trial_in_flight: false,
            })),
        }
    }

    /// Asks whether a call may proceed.
    ///
    /// Returns `false` while open (and the cool-down has not elapsed) or
    /// while another trial call is already probing in half-open.
    pub async fn allow(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = state
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cool_down);
                if cooled {
                    tracing::info!(breaker = %self.name, "circuit half-open, allowing trial call");
                    state.state = CircuitState::HalfOpen;
                    state.trial_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if state.trial_in_flight {
                    false
                } else {
                    state.trial_in_flight = true;
                    true
                }
            }
        }
    }

    /// Records a successful call.
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        match state.state {
            CircuitState::Closed => {
                self.observe(&mut state, false);
            }
            CircuitState::HalfOpen => {
                tracing::info!(breaker = %self.name, "trial succeeded, closing circuit");
                state.state = CircuitState::Closed;
                state.opened_at = None;
                state.trial_in_flight = false;
                state.reset_window(Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call.
    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        match state.state {
            CircuitState::Closed => {
                self.observe(&mut state, true);
                let tripped = state.requests >= self.config.min_requests
                    && f64::from(state.failures) / f64::from(state.requests)
                        >= self.config.failure_ratio;
                if tripped {
                    tracing::warn!(
                        breaker = %self.name,
                        failures = state.failures,
                        requests = state.requests,
                        "failure ratio exceeded, opening circuit"
                    );
                    state.state = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(breaker = %self.name, "trial failed, reopening circuit");
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
                state.trial_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Returns the current state, for logs and tests.
    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    fn observe(&self, state: &mut BreakerState, failed: bool) {
        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.config.window {
            state.reset_window(now);
        }
        state.requests += 1;
        if failed {
            state.failures += 1;
        }
    }
}
