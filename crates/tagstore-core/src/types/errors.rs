//! # Error Types
//!
//! One error enum per collaborator, plus the store's own taxonomy.
//!
//! The collaborator enums keep "not found" and "already exists" as their own
//! variants so the store can tell a fall-through condition apart from a real
//! failure at every tier boundary.

use super::DigestError;
use std::fmt;
use thiserror::Error;

// =============================================================================
// TIER
// =============================================================================

/// A storage layer in the resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The local on-disk cache.
    Disk,
    /// The durable remote backend.
    Backend,
}

impl Tier {
    /// Short name used in error context and log fields.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disk => "fs",
            Self::Backend => "backend",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// COLLABORATOR ERRORS
// =============================================================================

/// Errors reported by a local cache (`FileStore`).
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry exists under the name.
    #[error("cache file not found: {0}")]
    NotFound(String),

    /// An entry already exists under the name.
    #[error("cache file already exists: {0}")]
    AlreadyExists(String),

    /// Entry content exceeds the configured bound.
    #[error("cache file {name} too large: {size} bytes (max {max})")]
    TooLarge {
        name: String,
        size: usize,
        max: usize,
    },

    /// Underlying storage failure.
    #[error("cache I/O error: {0}")]
    Io(String),
}

impl CacheError {
    /// Whether this error means the entry is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error means the entry was already present.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors reported by a backend resolver or client.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend holds no blob under the requested name.
    #[error("blob not found")]
    BlobNotFound,

    /// No backend is configured for the tag's namespace.
    #[error("no backend client matches tag {0:?}")]
    NoClient(String),

    /// A namespace pattern could not be compiled.
    #[error("invalid namespace pattern: {0}")]
    InvalidNamespace(String),

    /// Transport or storage failure inside the client.
    #[error("{0}")]
    Client(String),
}

impl BackendError {
    /// Whether this error is the "blob not found" sentinel.
    #[must_use]
    pub const fn is_blob_not_found(&self) -> bool {
        matches!(self, Self::BlobNotFound)
    }
}

/// I/O failures are client failures. A client decides itself which missing
/// file means a missing blob.
impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::Client(e.to_string())
    }
}

/// Errors reported by a write-back scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler no longer accepts tasks.
    #[error("write-back scheduler closed")]
    Closed,

    /// The task could not be encoded or decoded.
    #[error("task serialization error: {0}")]
    Serialization(String),

    /// Durable task storage failed.
    #[error("task storage error: {0}")]
    Io(String),
}

// =============================================================================
// STORE ERRORS
// =============================================================================

/// Errors returned by `Store::put` and `Store::get`.
///
/// `TagNotFound` is the only variant meaning "the tag does not exist".
/// Every other variant means a dependency is degraded or returned bad data.
#[derive(Debug, Error)]
pub enum TagStoreError {
    /// The tag is absent from every tier.
    #[error("tag not found")]
    TagNotFound,

    /// The tag is empty or too long.
    #[error("invalid tag: {0}")]
    InvalidTag(String),

    /// Writing the tag to the local cache failed.
    #[error("write tag to disk: {0}")]
    WriteTag(#[source] CacheError),

    /// Marking the local entry persist-eligible failed.
    #[error("set persist metadata: {0}")]
    SetPersistMetadata(#[source] CacheError),

    /// Reading the local cache failed for a reason other than absence.
    #[error("fs: {0}")]
    Cache(#[source] CacheError),

    /// Selecting a backend client for the tag failed.
    #[error("backend manager: {0}")]
    BackendManager(#[source] BackendError),

    /// The backend client failed for a reason other than absence.
    #[error("backend client: {0}")]
    BackendClient(#[source] BackendError),

    /// Content read from a tier is not a canonical digest.
    #[error("parse {tier} digest: {source}")]
    MalformedDigest {
        tier: Tier,
        #[source]
        source: DigestError,
    },

    /// The write-back task could not be enqueued.
    #[error("add write-back task: {0}")]
    Enqueue(#[source] SchedulerError),
}

impl TagStoreError {
    /// Whether the caller should treat this as "tag does not exist".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::TagNotFound)
    }
}
