//! Backoff schedule for rate-limited calls

use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff: retry `n` (1-based) waits
/// `base_delay * 2^(n-1) + jitter`, jitter uniform in `[0, max_jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_jitter,
        }
    }

    /// Same schedule, different retry budget
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Total attempts including the initial one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Deterministic part of the schedule
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .saturating_add(jitter)
    }

    /// Delay before retry `attempt`, with fresh jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay_for(attempt, self.jitter())
    }

    fn jitter(&self) -> Duration {
        let max_micros = self.max_jitter.as_micros() as u64;
        if max_micros == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::thread_rng().gen_range(0..max_micros))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_millis(500))
    }
}
