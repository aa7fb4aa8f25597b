//! # CLI Command Implementations

use crate::api::{self, AppState};
use crate::config::Config;
use crate::error::AppError;
use crate::services::Services;
use crate::worker;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tagstore_core::{Digest, ExecutorReport, Store, WriteBackTask};
use tokio::sync::watch;

/// Maximum size of a file hashed by `digest` (1 GiB).
const MAX_DIGEST_FILE_SIZE: u64 = 1024 * 1024 * 1024;

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Serve the HTTP API and run the write-back worker until Ctrl+C.
pub async fn cmd_server(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
) -> Result<(), AppError> {
    let services = Services::open(&config)?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    if !quiet {
        println!("tagstore v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Configuration:");
        println!("  Listen:    {}", addr);
        println!("  Cache:     {:?} {:?}", config.cache, config.cache_path);
        println!("  Queue:     {:?}", config.queue_path);
        println!("  Backends:  {}", services.backends.len());
        println!(
            "  Write-back delay: {}s",
            config.write_back.default_delay_secs
        );
        println!();
        println!("Endpoints:");
        println!("  PUT /tags/{{tag}} - Store a tag");
        println!("  GET /tags/{{tag}} - Resolve a tag");
        println!("  GET /health      - Health check");
        println!();
        println!("Press Ctrl+C to stop");
        println!();
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = worker::spawn(
        services.executor.clone(),
        config.write_back.poll_interval(),
        shutdown_rx,
    );

    let state = AppState::new(services.store.clone(), config.write_back.default_delay())
        .with_api_key(config.api_key());
    let result = api::run_server(&addr, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Write-back worker did not stop cleanly");
    }
    result
}

// =============================================================================
// TAG COMMANDS
// =============================================================================

/// Map a tag to a digest.
pub fn cmd_put(
    config: &Config,
    tag: &str,
    digest: &str,
    delay_secs: Option<u64>,
    json_mode: bool,
) -> Result<(), AppError> {
    let digest = Digest::parse(digest)?;
    let delay = delay_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.write_back.default_delay());
    let services = Services::open(config)?;

    services.store.put(tag, &digest, delay)?;

    if json_mode {
        print_json(&serde_json::json!({
            "tag": tag,
            "digest": digest.to_string(),
            "write_back_delay_secs": delay.as_secs(),
        }));
    } else {
        println!("{} -> {} (write-back in {}s)", tag, digest, delay.as_secs());
    }
    Ok(())
}

/// Resolve a tag.
pub fn cmd_get(config: &Config, tag: &str, json_mode: bool) -> Result<(), AppError> {
    let services = Services::open(config)?;
    let digest = services.store.get(tag)?;

    if json_mode {
        print_json(&serde_json::json!({
            "tag": tag,
            "digest": digest.to_string(),
        }));
    } else {
        println!("{}", digest);
    }
    Ok(())
}

// =============================================================================
// WRITE-BACK COMMANDS
// =============================================================================

/// Run write-back tasks once.
pub fn cmd_flush(config: &Config, force: bool, json_mode: bool) -> Result<(), AppError> {
    let services = Services::open(config)?;
    let now = SystemTime::now();
    let report: ExecutorReport = if force {
        services.executor.run_all(now)?
    } else {
        services.executor.run_due(now)?
    };
    let remaining = services.queue.len()?;

    if json_mode {
        print_json(&serde_json::json!({
            "uploaded": report.uploaded,
            "retried": report.retried,
            "dropped": report.dropped,
            "remaining": remaining,
        }));
    } else {
        println!("Write-back Flush");
        println!("================");
        println!("Uploaded:  {}", report.uploaded);
        println!("Retried:   {}", report.retried);
        println!("Dropped:   {}", report.dropped);
        println!("Remaining: {}", remaining);
    }
    Ok(())
}

/// List queued write-back tasks.
pub fn cmd_pending(config: &Config, json_mode: bool) -> Result<(), AppError> {
    let services = Services::open(config)?;
    let tasks = services.queue.pending()?;

    if json_mode {
        let tasks: Vec<serde_json::Value> = tasks.iter().map(task_json).collect();
        print_json(&serde_json::json!({ "pending": tasks }));
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No pending write-back tasks");
        return Ok(());
    }
    let now = SystemTime::now();
    for task in &tasks {
        let wait = task
            .not_before()
            .duration_since(now)
            .map(|d| format!("in {}s", d.as_secs()))
            .unwrap_or_else(|_| "due".to_string());
        print!("{} -> {}  {}  failures={}", task.source(), task.dest(), wait, task.failures());
        match task.last_error() {
            Some(e) => println!("  last_error={}", e),
            None => println!(),
        }
    }
    Ok(())
}

fn task_json(task: &WriteBackTask) -> serde_json::Value {
    serde_json::json!({
        "source": task.source(),
        "dest": task.dest(),
        "not_before": unix_secs(task.not_before()),
        "failures": task.failures(),
        "last_error": task.last_error(),
    })
}

// =============================================================================
// DIGEST COMMAND
// =============================================================================

/// Print the canonical digest of a file.
pub fn cmd_digest(file: &Path, json_mode: bool) -> Result<(), AppError> {
    let metadata = std::fs::metadata(file)
        .map_err(|e| AppError::Io(format!("{}: {}", file.display(), e)))?;
    if !metadata.is_file() {
        return Err(AppError::Io(format!("{} is not a regular file", file.display())));
    }
    if metadata.len() > MAX_DIGEST_FILE_SIZE {
        return Err(AppError::Io(format!(
            "{}: {} bytes exceeds maximum {}",
            file.display(),
            metadata.len(),
            MAX_DIGEST_FILE_SIZE
        )));
    }
    let content =
        std::fs::read(file).map_err(|e| AppError::Io(format!("{}: {}", file.display(), e)))?;
    let digest = Digest::of(&content);

    if json_mode {
        print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "digest": digest.to_string(),
        }));
    } else {
        println!("{}", digest);
    }
    Ok(())
}
