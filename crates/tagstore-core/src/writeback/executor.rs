//! # Write-Back Executor
//!
//! Runs due tasks from a `RedbTaskQueue`: reads the source entry from the
//! local cache and uploads it to the destination through the backend
//! resolver.
//!
//! Outcomes per task:
//! - upload succeeded: task removed, persist flag cleared
//! - source entry missing: task dropped, nothing left to upload
//! - any other failure: rescheduled with backoff until the policy gives up

use super::task::schedule_at;
use super::{RedbTaskQueue, RetryPolicy, WriteBackTask};
use crate::backend::BackendResolver;
use crate::storage::FileStore;
use crate::{BackendError, CacheError, Persist, SchedulerError};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why a single task execution failed.
#[derive(Debug, Error)]
pub enum WriteBackError {
    /// The local entry to upload no longer exists.
    #[error("source {0:?} missing from local cache")]
    SourceMissing(String),

    /// Reading the local entry failed.
    #[error("fs: {0}")]
    Cache(#[source] CacheError),

    /// No backend client could be selected for the destination.
    #[error("backend manager: {0}")]
    BackendManager(#[source] BackendError),

    /// The upload itself failed.
    #[error("backend client: {0}")]
    Upload(#[source] BackendError),
}

impl WriteBackError {
    /// Whether retrying can never succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SourceMissing(_))
    }
}

/// Summary of one `run_due` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorReport {
    /// Tasks uploaded and removed.
    pub uploaded: usize,
    /// Tasks that failed and were rescheduled.
    pub retried: usize,
    /// Tasks dropped without a successful upload.
    pub dropped: usize,
}

impl ExecutorReport {
    /// Total tasks attempted in the pass.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.uploaded + self.retried + self.dropped
    }
}

/// Executes write-back tasks against the local cache and backend.
pub struct WriteBackExecutor {
    fs: Arc<dyn FileStore>,
    backends: Arc<dyn BackendResolver>,
    queue: Arc<RedbTaskQueue>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for WriteBackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl WriteBackExecutor {
    /// Create an executor draining `queue`.
    #[must_use]
    pub fn new(
        fs: Arc<dyn FileStore>,
        backends: Arc<dyn BackendResolver>,
        queue: Arc<RedbTaskQueue>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fs,
            backends,
            queue,
            policy,
        }
    }

    /// The queue this executor drains.
    #[must_use]
    pub fn queue(&self) -> &Arc<RedbTaskQueue> {
        &self.queue
    }

    /// Execute every task due at `now` once.
    ///
    /// Only queue errors abort the pass; task failures are recorded on the
    /// task and counted in the report.
    pub fn run_due(&self, now: SystemTime) -> Result<ExecutorReport, SchedulerError> {
        self.run(self.queue.due(now)?, now)
    }

    /// Execute every pending task once, ignoring `not_before`.
    pub fn run_all(&self, now: SystemTime) -> Result<ExecutorReport, SchedulerError> {
        self.run(self.queue.pending()?, now)
    }

    fn run(
        &self,
        tasks: Vec<WriteBackTask>,
        now: SystemTime,
    ) -> Result<ExecutorReport, SchedulerError> {
        let mut report = ExecutorReport::default();
        for task in tasks {
            match self.execute(&task) {
                Ok(()) => {
                    if self.queue.complete(&task)? {
                        self.clear_persist(task.source());
                    }
                    info!(source = task.source(), dest = task.dest(), "Write-back uploaded");
                    report.uploaded += 1;
                }
                Err(e) if e.is_permanent() => {
                    self.queue.complete(&task)?;
                    error!(source = task.source(), dest = task.dest(), error = %e, "Write-back dropped");
                    report.dropped += 1;
                }
                Err(e) => {
                    let failures = task.failures().saturating_add(1);
                    if self.policy.exhausted(failures) {
                        self.queue.complete(&task)?;
                        error!(
                            source = task.source(),
                            dest = task.dest(),
                            failures,
                            error = %e,
                            "Write-back retries exhausted, dropping task"
                        );
                        report.dropped += 1;
                    } else {
                        let backoff = self.policy.backoff(failures);
                        let retry_at = schedule_at(now, backoff);
                        self.queue
                            .reschedule(&task, task.failed(e.to_string(), retry_at))?;
                        warn!(
                            source = task.source(),
                            dest = task.dest(),
                            failures,
                            ?backoff,
                            error = %e,
                            "Write-back failed, rescheduled"
                        );
                        report.retried += 1;
                    }
                }
            }
        }
        if report.attempted() > 0 {
            debug!(?report, "Write-back pass finished");
        }
        Ok(report)
    }

    /// Upload one task's source entry to its destination.
    pub fn execute(&self, task: &WriteBackTask) -> Result<(), WriteBackError> {
        let mut reader = self
            .fs
            .get_cache_file_reader(task.source())
            .map_err(|e| match e {
                CacheError::NotFound(name) => WriteBackError::SourceMissing(name),
                other => WriteBackError::Cache(other),
            })?;
        let client = self
            .backends
            .get_client(task.dest())
            .map_err(WriteBackError::BackendManager)?;
        client
            .upload(task.dest(), &mut reader)
            .map_err(WriteBackError::Upload)
    }

    fn clear_persist(&self, name: &str) {
        if let Err(e) = self.fs.set_cache_file_metadata(name, &Persist(false)) {
            warn!(name, error = %e, "Failed to clear persist metadata after upload");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
