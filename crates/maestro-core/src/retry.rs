use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configures retry behaviour for a task's execution attempts.
///
/// Delays grow exponentially from `backoff_base_ms`, doubling per attempt and
/// capped at `backoff_max_ms`. With `jitter` enabled (the default) each delay
/// is drawn uniformly from the upper half of the computed interval, which
/// spreads retry bursts across concurrent tasks hitting the same backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of execution attempts, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Cap in milliseconds for the computed delay.
    pub backoff_max_ms: u64,
    /// Whether to randomize each delay within its interval.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
            jitter: false,
        }
    }

    /// Computes the delay before the retry following failed attempt number
    /// `attempt` (1-based).
    ///
    /// The deterministic curve is `backoff_base_ms * 2^(attempt - 1)` capped
    /// at `backoff_max_ms`; jitter draws from `[delay / 2, delay]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let delay = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(exp))
            .min(self.backoff_max_ms);

        let delay = if self.jitter && delay > 1 {
            rand::thread_rng().gen_range(delay / 2..=delay)
        } else {
            delay
        };

        Duration::from_millis(delay)
    }
}
