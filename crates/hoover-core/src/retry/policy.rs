use std::time::Duration;

/// High-level classification of a failure.
///
/// Every kind is redelivered through the queue; the kind only feeds logs
/// and decides whether the throttling floor applies to the backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// 5xx other than 503.
    Http5xx(u16),
    /// 404 / 410 or an empty body.
    NotFound,
    /// Anything else (filesystem, unexpected status).
    Other,
}

/// Decision returned by the redelivery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Delivery budget exhausted: dead-letter the item.
    NoRetry,
    /// Make the item available again after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff with a cap and a bounded number of deliveries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of deliveries (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Decide what happens after delivery number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        // base * 2^(attempt-1), capped.
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        let mut delay = self.base_delay.saturating_mul(exp);
        if kind == ErrorKind::Throttled {
            delay = delay.max(self.base_delay.saturating_mul(4));
        }
        RetryDecision::RetryAfter(delay.min(self.max_delay))
    }
}
