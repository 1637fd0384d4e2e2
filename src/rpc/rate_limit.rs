//! Minimum-interval rate limiting for a single gateway

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Enforces a minimum interval between the end of one request and the
/// start of the next. Share one limiter (`Arc`) between every client that
/// talks to the same gateway.
pub struct RateLimiter {
    interval: Duration,
    /// When the previous request returned
    last_request: Mutex<Option<Instant>>,
}

/// Held for the duration of one request; the limiter is stamped on drop
pub struct RateLimitPermit<'a> {
    last_request: MutexGuard<'a, Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspend until a request is permitted. Concurrent callers queue on the
    /// permit, so at most one request is in flight per limiter.
    pub async fn acquire(&self) -> RateLimitPermit<'_> {
        let last_request = self.last_request.lock().await;

        if let Some(last) = *last_request {
            let ready_at = last + self.interval;
            if Instant::now() < ready_at {
                trace!("Rate limiter waiting {:?}", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }

        RateLimitPermit { last_request }
    }
}

impl Drop for RateLimitPermit<'_> {
    fn drop(&mut self) {
        *self.last_request = Some(Instant::now());
    }
}
