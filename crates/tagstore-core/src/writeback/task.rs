//! Write-back task values.

use crate::primitives::LATEST_SCHEDULE_SECS;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `now + delay`, saturating to a far-future time when the sum overflows.
#[must_use]
pub(crate) fn schedule_at(now: SystemTime, delay: Duration) -> SystemTime {
    now.checked_add(delay)
        .unwrap_or(UNIX_EPOCH + Duration::from_secs(LATEST_SCHEDULE_SECS))
}

/// A pending upload of a cached entry to the backend.
///
/// Created by `Put` and handed to a `WriteBackScheduler` by value; the
/// creator keeps no reference. Only the scheduler's own executor updates the
/// retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBackTask {
    source: String,
    dest: String,
    not_before: SystemTime,
    failures: u32,
    last_error: Option<String>,
}

impl WriteBackTask {
    /// A task eligible for execution immediately.
    #[must_use]
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::with_delay(source, dest, Duration::ZERO)
    }

    /// A task eligible for execution `delay` from now.
    #[must_use]
    pub fn with_delay(source: impl Into<String>, dest: impl Into<String>, delay: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            source: source.into(),
            dest: dest.into(),
            not_before: schedule_at(now, delay),
            failures: 0,
            last_error: None,
        }
    }

    /// Cache key of the content to upload.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Backend key to upload to.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Earliest time the task may run.
    #[must_use]
    pub fn not_before(&self) -> SystemTime {
        self.not_before
    }

    /// Number of failed attempts so far.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Error of the most recent failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the task may run at `now`.
    #[must_use]
    pub fn is_due(&self, now: SystemTime) -> bool {
        self.not_before <= now
    }

    /// The same task after one more failed attempt.
    #[must_use]
    pub(crate) fn failed(&self, error: String, retry_at: SystemTime) -> Self {
        Self {
            source: self.source.clone(),
            dest: self.dest.clone(),
            not_before: retry_at,
            failures: self.failures.saturating_add(1),
            last_error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_pushes_not_before() {
        let before = SystemTime::now();
        let task = WriteBackTask::with_delay("t", "t", Duration::from_secs(30));

        assert!(task.not_before() >= before + Duration::from_secs(30));
        assert!(!task.is_due(before));
        assert!(task.is_due(before + Duration::from_secs(31)));
    }

    #[test]
    fn overflowing_delay_is_never_due_soon() {
        let task = WriteBackTask::with_delay("t", "t", Duration::from_secs(u64::MAX));

        assert!(!task.is_due(SystemTime::now() + Duration::from_secs(365 * 24 * 3600)));
        assert_eq!(
            task.not_before(),
            UNIX_EPOCH + Duration::from_secs(LATEST_SCHEDULE_SECS)
        );
    }

    #[test]
    fn immediate_task_is_due() {
        let task = WriteBackTask::new("src", "dst");
        assert!(task.is_due(SystemTime::now()));
        assert_eq!(task.source(), "src");
        assert_eq!(task.dest(), "dst");
        assert_eq!(task.failures(), 0);
    }

    #[test]
    fn failed_records_attempt() {
        let task = WriteBackTask::new("t", "t");
        let retry_at = SystemTime::now() + Duration::from_secs(5);
        let failed = task.failed("backend down".to_string(), retry_at);

        assert_eq!(failed.failures(), 1);
        assert_eq!(failed.last_error(), Some("backend down"));
        assert_eq!(failed.not_before(), retry_at);
        assert_eq!(failed.source(), task.source());
    }
}
