//! # Application Errors
//!
//! Everything the binary can fail with, wrapped around the core error types.

use tagstore_core::{BackendError, CacheError, DigestError, SchedulerError, TagStoreError};
use thiserror::Error;

/// Errors surfaced by the CLI, server and worker.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration file could not be read or is invalid.
    #[error("config: {0}")]
    Config(String),

    /// Opening or using the local cache failed.
    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    /// Building a backend client failed.
    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    /// The write-back queue failed.
    #[error("write-back queue: {0}")]
    Scheduler(#[from] SchedulerError),

    /// A tag store operation failed.
    #[error(transparent)]
    Store(#[from] TagStoreError),

    /// A digest argument was malformed.
    #[error("invalid digest: {0}")]
    Digest(#[from] DigestError),

    /// Local I/O outside the store.
    #[error("I/O: {0}")]
    Io(String),

    /// The HTTP server failed to bind or crashed.
    #[error("server: {0}")]
    Server(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
