//! # Write-Back Propagation
//!
//! Delayed, retryable upload of locally cached entries to the backend.
//!
//! The store only ever sees `WriteBackScheduler::add`: it builds a task,
//! moves it into the scheduler and forgets about it. Durability, timing and
//! retries belong to the scheduler side:
//! - `RedbTaskQueue`: durable queue keyed by `(source, dest)`
//! - `WriteBackExecutor`: runs due tasks from the queue with a `RetryPolicy`
//! - `ChannelScheduler`: hands tasks to an in-process consumer over a channel

mod executor;
mod queue;
mod retry;
mod task;

pub use executor::{ExecutorReport, WriteBackError, WriteBackExecutor};
pub use queue::RedbTaskQueue;
pub use retry::RetryPolicy;
pub use task::WriteBackTask;

use crate::SchedulerError;
use std::sync::mpsc::{self, Receiver, Sender};

/// Accepts write-back tasks and guarantees their eventual execution.
pub trait WriteBackScheduler: Send + Sync {
    /// Take ownership of `task`.
    ///
    /// `Ok` means the task is accepted; it does not mean the upload ran.
    fn add(&self, task: WriteBackTask) -> Result<(), SchedulerError>;
}

/// A scheduler that forwards tasks to a channel.
///
/// The receiving side decides when and how tasks run. Once the receiver is
/// dropped, `add` fails with `SchedulerError::Closed`.
#[derive(Debug)]
pub struct ChannelScheduler {
    tx: Sender<WriteBackTask>,
}

impl ChannelScheduler {
    /// Create a scheduler and the receiver its tasks arrive on.
    #[must_use]
    pub fn new() -> (Self, Receiver<WriteBackTask>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl WriteBackScheduler for ChannelScheduler {
    fn add(&self, task: WriteBackTask) -> Result<(), SchedulerError> {
        self.tx.send(task).map_err(|_| SchedulerError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_scheduler_hands_over_tasks() {
        let (scheduler, rx) = ChannelScheduler::new();
        scheduler.add(WriteBackTask::new("t", "t")).expect("add");

        let task = rx.try_recv().expect("task");
        assert_eq!(task.source(), "t");
    }

    #[test]
    fn channel_scheduler_closed_after_receiver_drop() {
        let (scheduler, rx) = ChannelScheduler::new();
        drop(rx);

        let result = scheduler.add(WriteBackTask::new("t", "t"));
        assert!(matches!(result, Err(SchedulerError::Closed)));
    }
}
