//! Connection-level retry with jittered linear backoff.

use std::time::Duration;

use rand::Rng;

/// Retry budget applied inside the transport channel.
///
/// Only transient error classes are re-attempted (see
/// [`crate::TransportError::is_transient`]); application rejections pass
/// through untouched.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    /// Base wait between attempts; grows linearly per attempt.
    pub base_backoff: Duration,
    /// Jitter fraction applied to each wait, e.g. 0.1 for ±10%.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Computes the wait before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let linear = self.base_backoff.as_secs_f64() * f64::from(attempt);
        let spread = linear * self.jitter;
        let jittered = if spread > 0.0 {
            rand::thread_rng().gen_range(linear - spread..=linear + spread)
        } else {
            linear
        };
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_within_jitter_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..=3 {
            let wait = policy.backoff(attempt);
            let linear = f64::from(attempt);
            assert!(wait.as_secs_f64() >= linear * 0.9);
            assert!(wait.as_secs_f64() <= linear * 1.1);
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            jitter: 0.0,
        };
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
    }
}
