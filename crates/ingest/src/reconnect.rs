//! Exponential-backoff policy for stream reconnection.
//!
//! The delay before attempt `n` (1-based) is `base * 2^(n-1)`. After
//! `max_attempts` consecutive failures the reader gives up.

use std::time::Duration;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnection attempt.
    pub base_delay: Duration,
    /// Number of reconnection attempts before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the given 1-based attempt.
    ///
    /// Attempt 0 is treated as attempt 1. The shift saturates rather than
    /// overflowing for absurd attempt numbers.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}
