// src/exec/retry.rs

//! Backoff delays between task attempts.

use std::time::Duration;

use crate::dag::RetryConfig;
use crate::types::BackoffStrategy;

/// Delay to wait after failed attempt `attempt` (1-based) before the next one.
///
/// - exponential: `initial_delay * 2^(attempt - 1)`
/// - linear: `initial_delay * attempt`
/// - fixed: `initial_delay`
///
/// No jitter is applied. `attempt == 0` means no attempt has failed yet and
/// yields zero. Large attempt numbers saturate instead of overflowing.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let initial = config.initial_delay;
    match config.backoff_strategy {
        BackoffStrategy::Exponential => {
            initial.saturating_mul(2u32.saturating_pow(attempt - 1))
        }
        BackoffStrategy::Linear => initial.saturating_mul(attempt),
        BackoffStrategy::Fixed => initial,
    }
}

impl RetryConfig {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff_delay(self, attempt)
    }

    /// Total number of attempts this config allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
