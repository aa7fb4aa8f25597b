//! # Local Cache Storage
//!
//! The `FileStore` trait is the local tier's contract. Two implementations:
//! - `RedbFileStore`: durable, backed by a redb database file
//! - `MemFileStore`: volatile, for tests and throwaway deployments
//!
//! Both guarantee that `create_cache_file` is create-if-absent and atomic per
//! name, and that absence is reported as `CacheError::NotFound`.

mod memory;
mod redb_cache;

pub use memory::MemFileStore;
pub use redb_cache::RedbFileStore;

use crate::primitives::MAX_CACHE_FILE_SIZE;
use crate::{CacheError, Persist};
use std::io::Read;

/// Operations required for storing tags on local disk.
pub trait FileStore: Send + Sync {
    /// Create an entry from `content`.
    ///
    /// Fails with `CacheError::AlreadyExists` if the name is taken; the
    /// existing content is left untouched.
    fn create_cache_file(&self, name: &str, content: &mut dyn Read) -> Result<(), CacheError>;

    /// Set the persist flag of an existing entry.
    ///
    /// Returns whether the stored flag changed.
    fn set_cache_file_metadata(&self, name: &str, md: &Persist) -> Result<bool, CacheError>;

    /// Read the persist flag of an existing entry (unset reads as false).
    fn get_cache_file_metadata(&self, name: &str) -> Result<Persist, CacheError>;

    /// Open the content of an entry for reading.
    fn get_cache_file_reader(&self, name: &str) -> Result<Box<dyn Read + Send>, CacheError>;
}

/// Buffer `content` up to `MAX_CACHE_FILE_SIZE` bytes.
pub(crate) fn read_bounded(name: &str, content: &mut dyn Read) -> Result<Vec<u8>, CacheError> {
    let mut buf = Vec::new();
    content
        .take(MAX_CACHE_FILE_SIZE as u64 + 1)
        .read_to_end(&mut buf)?;
    if buf.len() > MAX_CACHE_FILE_SIZE {
        return Err(CacheError::TooLarge {
            name: name.to_string(),
            size: buf.len(),
            max: MAX_CACHE_FILE_SIZE,
        });
    }
    Ok(buf)
}
