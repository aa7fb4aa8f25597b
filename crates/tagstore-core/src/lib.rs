//! # tagstore-core
//!
//! Two-tier tag resolution store - THE LOGIC.
//!
//! Maps human-readable tags (image references and the like) to SHA-256
//! content digests. Tags are written to a fast local cache and propagated
//! to a durable backend by delayed, retryable write-back tasks.
//!
//! ## Architecture
//!
//! ```text
//!   put(tag, digest, delay)              get(tag)
//!          │                                │
//!          ▼                                ▼
//!   ┌──────────────┐  not found   ┌──────────────────┐
//!   │  FileStore   │ ───────────▶ │ BackendResolver  │
//!   │ (local tier) │ ◀─────────── │ (durable tier)   │
//!   └──────┬───────┘ write-through└────────▲─────────┘
//!          │ add(task)                     │ upload
//!          ▼                               │
//!   ┌─────────────────────┐       ┌────────┴─────────┐
//!   │ WriteBackScheduler  │ ────▶ │ WriteBackExecutor│
//!   └─────────────────────┘       └──────────────────┘
//! ```
//!
//! ## Architectural Constraints
//!
//! - Synchronous: every collaborator call blocks; callers wanting async
//!   wrap the store themselves
//! - No internal retries: `put`/`get` failures go back to the caller,
//!   upload failures belong to the scheduler
//! - "Not found" is never confused with "failed" at any tier boundary

// =============================================================================
// MODULES
// =============================================================================

pub mod backend;
pub mod primitives;
pub mod storage;
pub mod tag_store;
pub mod types;
pub mod writeback;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BackendError, CacheError, Digest, DigestError, Persist, SchedulerError, TagStoreError, Tier,
    validate_tag,
};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use tag_store::{BackendTierResolver, DiskResolver, Store, TagResolver, TagStore};

// =============================================================================
// RE-EXPORTS: Collaborators
// =============================================================================

pub use backend::{BackendClient, BackendManager, BackendResolver, FsBackend, MemBackend};
pub use storage::{FileStore, MemFileStore, RedbFileStore};
pub use writeback::{
    ChannelScheduler, ExecutorReport, RedbTaskQueue, RetryPolicy, WriteBackError,
    WriteBackExecutor, WriteBackScheduler, WriteBackTask,
};
