//! # Write-Back Worker
//!
//! Background tokio task that periodically runs due write-back tasks.
//! The executor blocks on redb and backend I/O, so each pass runs on the
//! blocking pool.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tagstore_core::WriteBackExecutor;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the worker. It stops once `shutdown` turns `true` or its sender
/// is dropped; an in-flight pass is allowed to finish first.
pub fn spawn(
    executor: Arc<WriteBackExecutor>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(?poll_interval, "Write-back worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => run_pass(&executor).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Write-back worker stopped");
    })
}

async fn run_pass(executor: &Arc<WriteBackExecutor>) {
    let executor = Arc::clone(executor);
    match tokio::task::spawn_blocking(move || executor.run_due(SystemTime::now())).await {
        Ok(Ok(report)) if report.attempted() > 0 => {
            tracing::info!(
                uploaded = report.uploaded,
                retried = report.retried,
                dropped = report.dropped,
                "Write-back pass"
            );
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Write-back queue error"),
        Err(e) => tracing::error!(error = %e, "Write-back pass aborted"),
    }
}
