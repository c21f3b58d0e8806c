//! Retry policy: decides redelivery delays.

use std::time::Duration;

/// Exponential backoff with a capped exponent and an optional retry ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first redelivery.
    pub base_delay: Duration,

    /// Maximum number of doublings applied to `base_delay`.
    pub max_exponent: u32,

    /// Receive count at which a retriable failure is handed to the queue's
    /// redrive policy instead of being delayed again. `None` disables it.
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY_SECS: u64 = 30;
    pub const DEFAULT_MAX_EXPONENT: u32 = 10;

    pub fn new(max_retries: Option<u32>) -> Self {
        Self {
            base_delay: Duration::from_secs(Self::DEFAULT_BASE_DELAY_SECS),
            max_exponent: Self::DEFAULT_MAX_EXPONENT,
            // 0 means "not configured"
            max_retries: max_retries.filter(|&n| n > 0),
        }
    }

    /// Delay before the next delivery, given how many deliveries happened so far.
    ///
    /// `delay = base_delay * 2^min(max(receive_count - 1, 0), max_exponent)`
    ///
    /// With the defaults:
    /// - receive count 0 or 1: 30s
    /// - receive count 2: 60s
    /// - receive count 4: 240s
    /// - receive count 11 and above: 30720s
    pub fn next_delay(&self, receive_count: u32) -> Duration {
        let exponent = receive_count.saturating_sub(1).min(self.max_exponent);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Has this message been delivered often enough to stop delaying it?
    pub fn is_exhausted(&self, receive_count: u32) -> bool {
        self.max_retries
            .is_some_and(|max_retries| receive_count >= max_retries)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(None)
    }
}
