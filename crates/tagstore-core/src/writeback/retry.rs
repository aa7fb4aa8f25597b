//! Upload retry policy with exponential backoff.
//!
//! Integer arithmetic only: the delay after the n-th failure is
//! `initial_delay * multiplier^(n-1)`, capped at `max_delay`.

use crate::primitives::{
    DEFAULT_RETRY_INITIAL_DELAY, DEFAULT_RETRY_MAX_DELAY, DEFAULT_RETRY_MULTIPLIER,
};
use std::time::Duration;

/// How failed uploads are rescheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    /// Failures after which a task is dropped. `None` retries forever.
    pub max_failures: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::daemon()
    }
}

impl RetryPolicy {
    /// Retry forever, backing off up to five minutes between attempts.
    #[must_use]
    pub fn daemon() -> Self {
        Self {
            initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
            multiplier: DEFAULT_RETRY_MULTIPLIER,
            max_failures: None,
        }
    }

    /// Millisecond delays and three attempts, for tests.
    #[must_use]
    pub fn test() -> Self {
        Self {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            multiplier: 2,
            max_failures: Some(3),
        }
    }

    /// Delay before the next attempt after `failures` failed attempts.
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..failures {
            if delay >= self.max_delay || self.multiplier <= 1 {
                break;
            }
            delay = delay.saturating_mul(self.multiplier).min(self.max_delay);
        }
        delay
    }

    /// Whether a task with `failures` failed attempts should be dropped.
    #[must_use]
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_failures.is_some_and(|max| failures >= max)
    }
}
