//! # Core Type Definitions
//!
//! This module contains the value types shared by every tier:
//! - Content digests (`Digest`, `DigestError`)
//! - Local cache metadata (`Persist`)
//! - Error types (`CacheError`, `BackendError`, `SchedulerError`, `TagStoreError`)
//! - Tag validation

mod digest;
mod errors;

pub use digest::{Digest, DigestError};
pub use errors::{BackendError, CacheError, SchedulerError, TagStoreError, Tier};

use crate::primitives::MAX_TAG_LENGTH;

// =============================================================================
// TAG VALIDATION
// =============================================================================

/// Validate a tag name before it reaches any tier.
///
/// Tags are opaque: the only requirements are non-empty and bounded length.
pub fn validate_tag(tag: &str) -> Result<(), TagStoreError> {
    if tag.is_empty() {
        return Err(TagStoreError::InvalidTag("tag is empty".to_string()));
    }
    if tag.len() > MAX_TAG_LENGTH {
        return Err(TagStoreError::InvalidTag(format!(
            "tag length {} exceeds maximum {} bytes",
            tag.len(),
            MAX_TAG_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// PERSIST METADATA
// =============================================================================

/// Persist flag attached to a local cache entry.
///
/// A set flag marks the entry as upload-pending: it must survive local
/// eviction until the write-back has reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Persist(pub bool);

impl Persist {
    /// Flag as stored on disk.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        if self.0 { 1 } else { 0 }
    }

    /// Decode a stored flag. Any non-zero byte counts as set.
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        Self(b != 0)
    }

    /// Whether the entry is persist-eligible.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0
    }
}
