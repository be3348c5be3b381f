//! Fixed-interval rate limiting for external generation calls.
//!
//! Two intervals only: a minimum gap between consecutive calls, and a
//! longer cooldown after a task-level failure. No adaptive backoff.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces the generation API's request-rate ceiling.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    failure_cooldown: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, failure_cooldown: Duration) -> Self {
        Self {
            min_interval,
            failure_cooldown,
            last_call: None,
        }
    }

    /// Suspend until at least `min_interval` has passed since the previous
    /// permitted call, then record the new call time.
    pub async fn throttle(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }

    /// Extended fixed wait after a task failure, reducing the chance of
    /// cascading failures during a transient outage.
    pub async fn cooldown(&mut self) {
        tracing::debug!(
            cooldown_secs = self.failure_cooldown.as_secs(),
            "Cooling down after task failure"
        );
        tokio::time::sleep(self.failure_cooldown).await;
        self.last_call = Some(Instant::now());
    }
}
