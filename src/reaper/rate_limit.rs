//! Fixed-window rate limiting
//!
//! Each window grants a full allowance of requests that may be used as a burst. Once it
//! is spent, the next request sleeps until the window ends and opens a new window from
//! that moment. Windows do not leak continuously.

use crate::service::RateLimit;
use tokio::time::{sleep_until, Instant};

/// Token bucket with a hard window reset
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimit,
    tokens_remaining: u32,
    window_end: Instant,
}

impl RateLimiter {
    /// Creates a limiter whose first request opens the first window immediately
    pub fn new(policy: RateLimit) -> Self {
        Self {
            policy,
            tokens_remaining: 0,
            window_end: Instant::now(),
        }
    }

    pub fn policy(&self) -> RateLimit {
        self.policy
    }

    /// Waits until one more request is allowed and consumes it
    pub async fn acquire(&mut self) {
        if self.tokens_remaining > 0 {
            self.tokens_remaining -= 1;
            return;
        }

        let now = Instant::now();
        if self.window_end > now {
            tracing::debug!(
                "Sleeping for {:.3} seconds to satisfy rate limit",
                (self.window_end - now).as_secs_f64()
            );
            sleep_until(self.window_end).await;
        }

        self.tokens_remaining = self.policy.requests_per_window.saturating_sub(1);
        self.window_end = Instant::now() + self.policy.window;
    }

    /// Drops the remaining allowance so the next request waits for the window end
    pub fn force_resync(&mut self) {
        self.tokens_remaining = 0;
    }

    pub fn tokens_remaining(&self) -> u32 {
        self.tokens_remaining
    }
}
