//! Backoff policy for rate-limited exchanges.

use std::time::Duration;

use reqwest::StatusCode;

/// Retry budget and backoff schedule.
///
/// The wait before retry `k` (zero based) is `base_delay × 2^k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts per exchange, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Every delay the policy can produce, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(|attempt| self.delay_for(attempt))
    }

    /// Statuses worth waiting out: rate limiting and service overload.
    #[must_use]
    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
    }
}
