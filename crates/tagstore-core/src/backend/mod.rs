//! # Backend Tier
//!
//! The durable remote tier, seen through two traits:
//! - `BackendResolver` picks the client responsible for a tag
//! - `BackendClient` moves a named blob to or from remote storage
//!
//! Clients must report a missing blob as `BackendError::BlobNotFound` so the
//! store can distinguish "tag does not exist" from a transport failure.
//!
//! ## Implementations
//!
//! - `BackendManager`: ordered namespace-regex routing to clients
//! - `FsBackend`: one file per blob under a root directory
//! - `MemBackend`: volatile, counts accesses for tests

mod fs;
mod manager;
mod memory;

pub use fs::FsBackend;
pub use manager::BackendManager;
pub use memory::MemBackend;

use crate::BackendError;
use std::io::{Read, Write};
use std::sync::Arc;

/// A client for one remote storage location.
pub trait BackendClient: Send + Sync {
    /// Write the blob stored under `name` into `dst`.
    fn download(&self, name: &str, dst: &mut dyn Write) -> Result<(), BackendError>;

    /// Store the content of `src` under `name`, replacing any previous blob.
    fn upload(&self, name: &str, src: &mut dyn Read) -> Result<(), BackendError>;
}

/// Maps a tag to the client that stores it.
pub trait BackendResolver: Send + Sync {
    /// Select the client for `tag`.
    ///
    /// A failure here is a configuration or availability problem, never a
    /// "not found" condition.
    fn get_client(&self, tag: &str) -> Result<Arc<dyn BackendClient>, BackendError>;
}
