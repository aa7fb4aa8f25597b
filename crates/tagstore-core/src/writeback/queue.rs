//! # redb-backed Write-Back Queue
//!
//! Durable `WriteBackScheduler`. Tasks are postcard-encoded and keyed by
//! `(source, dest)`, so at most one upload per key is pending. Re-adding a
//! key replaces the pending task: the upload always reads the current cache
//! content, so the newer task covers the older one.
//!
//! `complete` and `reschedule` are compare-and-swap on the stored task. If a
//! `Put` replaced the task while it was executing, the newer task survives.

use super::{WriteBackScheduler, WriteBackTask};
use crate::SchedulerError;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    backends::InMemoryBackend,
};
use std::path::Path;
use std::time::SystemTime;

/// Table for tasks: (source, dest) -> postcard-encoded task
const TASKS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("write_back_tasks");

fn io_err(e: impl std::fmt::Display) -> SchedulerError {
    SchedulerError::Io(e.to_string())
}

fn encode(task: &WriteBackTask) -> Result<Vec<u8>, SchedulerError> {
    postcard::to_allocvec(task).map_err(|e| SchedulerError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<WriteBackTask, SchedulerError> {
    postcard::from_bytes(bytes).map_err(|e| SchedulerError::Serialization(e.to_string()))
}

/// A durable queue of write-back tasks.
pub struct RedbTaskQueue {
    db: Database,
}

impl std::fmt::Debug for RedbTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbTaskQueue").finish_non_exhaustive()
    }
}

impl RedbTaskQueue {
    /// Open or create a queue database at the given path.
    ///
    /// Tasks left over from a previous run are kept and become due as usual.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;
        Self::init(db)
    }

    /// Create a queue that lives only in memory.
    pub fn in_memory() -> Result<Self, SchedulerError> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(io_err)?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, SchedulerError> {
        let write_txn = db.begin_write().map_err(io_err)?;
        let _ = write_txn.open_table(TASKS).map_err(io_err)?;
        write_txn.commit().map_err(io_err)?;

        let queue = Self { db };
        let pending = queue.len()?;
        if pending > 0 {
            tracing::info!(pending, "Write-back queue has tasks from a previous run");
        }
        Ok(queue)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> Result<u64, SchedulerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(TASKS).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    /// Whether no tasks are pending.
    pub fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.len()? == 0)
    }

    /// All pending tasks, ordered by key.
    pub fn pending(&self) -> Result<Vec<WriteBackTask>, SchedulerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(TASKS).map_err(io_err)?;
        let mut tasks = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            tasks.push(decode(value.value())?);
        }
        Ok(tasks)
    }

    /// Pending tasks whose `not_before` has passed at `now`, oldest first.
    pub fn due(&self, now: SystemTime) -> Result<Vec<WriteBackTask>, SchedulerError> {
        let mut tasks: Vec<_> = self
            .pending()?
            .into_iter()
            .filter(|t| t.is_due(now))
            .collect();
        tasks.sort_by_key(WriteBackTask::not_before);
        Ok(tasks)
    }

    /// Remove `task` if it is still the pending task for its key.
    ///
    /// Returns `false` when the task was replaced or already removed.
    pub fn complete(&self, task: &WriteBackTask) -> Result<bool, SchedulerError> {
        self.swap(task, None)
    }

    /// Replace `task` with `next` if `task` is still the pending one.
    pub fn reschedule(
        &self,
        task: &WriteBackTask,
        next: WriteBackTask,
    ) -> Result<bool, SchedulerError> {
        self.swap(task, Some(next))
    }

    fn swap(
        &self,
        expected: &WriteBackTask,
        next: Option<WriteBackTask>,
    ) -> Result<bool, SchedulerError> {
        let key = (expected.source(), expected.dest());
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let swapped = {
            let mut table = write_txn.open_table(TASKS).map_err(io_err)?;
            let current = match table.get(key).map_err(io_err)? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            if current.as_ref() != Some(expected) {
                false
            } else {
                match next {
                    Some(next) => {
                        let bytes = encode(&next)?;
                        table.insert(key, bytes.as_slice()).map_err(io_err)?;
                    }
                    None => {
                        table.remove(key).map_err(io_err)?;
                    }
                }
                true
            }
        };
        write_txn.commit().map_err(io_err)?;
        Ok(swapped)
    }
}

impl WriteBackScheduler for RedbTaskQueue {
    fn add(&self, task: WriteBackTask) -> Result<(), SchedulerError> {
        let bytes = encode(&task)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(TASKS).map_err(io_err)?;
            table
                .insert((task.source(), task.dest()), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        tracing::debug!(source = task.source(), dest = task.dest(), "Write-back task queued");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn add_and_list() {
        let queue = RedbTaskQueue::in_memory().expect("queue");
        queue.add(WriteBackTask::new("a", "a")).expect("add");
        queue.add(WriteBackTask::new("b", "b")).expect("add");

        let pending = queue.pending().expect("pending");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].source(), "a");
        assert_eq!(queue.len().expect("len"), 2);
    }

    #[test]
    fn re_adding_a_key_replaces_the_task() {
        let queue = RedbTaskQueue::in_memory().expect("queue");
        queue
            .add(WriteBackTask::with_delay("t", "t", Duration::from_secs(60)))
            .expect("add");
        queue.add(WriteBackTask::new("t", "t")).expect("add again");

        assert_eq!(queue.len().expect("len"), 1);
        assert_eq!(queue.due(SystemTime::now()).expect("due").len(), 1);
    }

    #[test]
    fn due_respects_not_before() {
        let queue = RedbTaskQueue::in_memory().expect("queue");
        queue
            .add(WriteBackTask::with_delay("later", "later", Duration::from_secs(3600)))
            .expect("add");
        queue.add(WriteBackTask::new("now", "now")).expect("add");

        let due = queue.due(SystemTime::now()).expect("due");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].source(), "now");
    }

    #[test]
    fn complete_only_removes_unchanged_task() {
        let queue = RedbTaskQueue::in_memory().expect("queue");
        let first = WriteBackTask::new("t", "t");
        queue.add(first.clone()).expect("add");

        // A newer Put replaces the task while `first` is executing.
        let newer = WriteBackTask::with_delay("t", "t", Duration::from_secs(30));
        queue.add(newer.clone()).expect("add newer");

        assert!(!queue.complete(&first).expect("complete stale"));
        assert_eq!(queue.pending().expect("pending"), vec![newer.clone()]);

        assert!(queue.complete(&newer).expect("complete"));
        assert!(queue.is_empty().expect("empty"));
    }

    #[test]
    fn reschedule_replaces_task() {
        let queue = RedbTaskQueue::in_memory().expect("queue");
        let task = WriteBackTask::new("t", "t");
        queue.add(task.clone()).expect("add");

        let retry_at = SystemTime::now() + Duration::from_secs(10);
        let next = task.failed("boom".to_string(), retry_at);
        assert!(queue.reschedule(&task, next).expect("reschedule"));

        let pending = queue.pending().expect("pending");
        assert_eq!(pending[0].failures(), 1);
        assert_eq!(pending[0].last_error(), Some("boom"));
        assert!(queue.due(SystemTime::now()).expect("due").is_empty());
    }

    #[test]
    fn tasks_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("queue.redb");

        {
            let queue = RedbTaskQueue::open(&path).expect("open");
            queue
                .add(WriteBackTask::with_delay("t", "t", Duration::from_secs(5)))
                .expect("add");
        }

        let queue = RedbTaskQueue::open(&path).expect("reopen");
        let pending = queue.pending().expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].dest(), "t");
    }
}
