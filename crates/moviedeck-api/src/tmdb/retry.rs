//! Retry budget and exponential backoff schedule.

use std::time::Duration;

/// Default number of attempts per logical call.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound for the delay between attempts.
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_millis(8000);

/// Retry budget and initial delay for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_INITIAL_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy.
    ///
    /// A budget of 0 is raised to a single attempt and an initial delay
    /// above [`MAX_BACKOFF_DELAY`] is clamped to it.
    #[must_use]
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            initial_delay: initial_delay.min(MAX_BACKOFF_DELAY),
        }
    }

    /// Total number of attempts allowed (the 401 token refresh is not counted).
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay slept after the first failed attempt.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Delay following `current`: doubled, capped at [`MAX_BACKOFF_DELAY`].
    #[must_use]
    pub fn next_delay(current: Duration) -> Duration {
        current.saturating_mul(2).min(MAX_BACKOFF_DELAY)
    }

    /// Delays slept between consecutive attempts when every attempt fails
    /// (one fewer than [`max_retries`](Self::max_retries)).
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay;
        for _ in 1..self.max_retries {
            delays.push(delay);
            delay = Self::next_delay(delay);
        }
        delays
    }
}
