//! Token-bucket rate limiter shared by all callers of one downstream.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Erroring token-bucket limiter.
///
/// Holds at most `rate` tokens and refills them continuously at `rate`
/// per second, so an idle bucket admits a burst of up to `rate` calls
/// back to back; only the sustained rate is capped, not sub-second
/// spacing. A call issued when no token is available fails
/// immediately — callers must treat that as a transient, retriable
/// condition, not a downstream fault. The bucket never queues.
///
/// Cloning shares the bucket, so every caller of the same downstream
/// observes the same token accounting.
#[derive(Clone)]
pub struct RateLimiter {
    rate: f64,
    state: Arc<Mutex<BucketState>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `rate` requests per second.
    pub fn per_second(rate: u32) -> Self {
        let rate = f64::from(rate.max(1));
        Self {
            rate,
            state: Arc::new(Mutex::new(BucketState {
                tokens: rate,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Takes one token, or reports that the bucket is empty.
    ///
    /// Returns `false` without blocking when no token is available.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.rate);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn excess_calls_within_one_second_are_rejected() {
        let limiter = RateLimiter::per_second(5);

        for _ in 0..5 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_refill_over_time() {
        let limiter = RateLimiter::per_second(2);

        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_never_exceeds_rate() {
        let limiter = RateLimiter::per_second(3);

        tokio::time::advance(Duration::from_secs(60)).await;
        for _ in 0..3 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_the_bucket() {
        let limiter = RateLimiter::per_second(1);
        let other = limiter.clone();

        assert!(limiter.try_acquire().await);
        assert!(!other.try_acquire().await);
    }
}
