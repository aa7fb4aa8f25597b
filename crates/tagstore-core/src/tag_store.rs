//! # Tag Store
//!
//! Two-level tag storage:
//! 1. Local cache (`FileStore`): makes tags readable immediately and holds
//!    them until the write-back has reached the backend.
//! 2. Backend (`BackendResolver`): durable, authoritative storage.
//!
//! `put` writes locally, marks the entry persist-eligible and enqueues a
//! delayed write-back task. It never touches the network.
//!
//! `get` walks an ordered list of resolvers. A resolver answers
//! `Ok(Some(digest))` (found), `Ok(None)` (not found here, try the next
//! tier) or `Err` (stop and surface the error). Only when every tier
//! answers "not found" does `get` return `TagStoreError::TagNotFound`.

use crate::backend::BackendResolver;
use crate::storage::{FileStore, read_bounded};
use crate::writeback::{WriteBackScheduler, WriteBackTask};
use crate::{CacheError, Digest, Persist, TagStoreError, Tier, validate_tag};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Tag storage operations.
pub trait Store: Send + Sync {
    /// Map `tag` to `digest`, readable immediately and uploaded to the
    /// backend no earlier than `write_back_delay` from now.
    fn put(&self, tag: &str, digest: &Digest, write_back_delay: Duration)
    -> Result<(), TagStoreError>;

    /// Resolve `tag` to its digest.
    fn get(&self, tag: &str) -> Result<Digest, TagStoreError>;
}

// =============================================================================
// RESOLVERS
// =============================================================================

/// One tier of the resolution chain.
pub trait TagResolver: Send + Sync {
    /// The tier this resolver reads from.
    fn tier(&self) -> Tier;

    /// `Ok(None)` means the tag is absent from this tier.
    fn resolve(&self, tag: &str) -> Result<Option<Digest>, TagStoreError>;
}

/// Write the canonical digest under `tag`, treating an existing entry as
/// success.
///
/// The existing entry is not compared against `digest`.
fn write_tag_to_disk(fs: &dyn FileStore, tag: &str, digest: &Digest) -> Result<(), CacheError> {
    let content = digest.to_string();
    match fs.create_cache_file(tag, &mut content.as_bytes()) {
        Err(e) if !e.is_already_exists() => Err(e),
        _ => Ok(()),
    }
}

/// Resolves tags from the local cache.
pub struct DiskResolver {
    fs: Arc<dyn FileStore>,
}

impl DiskResolver {
    #[must_use]
    pub fn new(fs: Arc<dyn FileStore>) -> Self {
        Self { fs }
    }
}

impl TagResolver for DiskResolver {
    fn tier(&self) -> Tier {
        Tier::Disk
    }

    fn resolve(&self, tag: &str) -> Result<Option<Digest>, TagStoreError> {
        let mut reader = match self.fs.get_cache_file_reader(tag) {
            Ok(r) => r,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(TagStoreError::Cache(e)),
        };
        let content = read_bounded(tag, &mut reader).map_err(TagStoreError::Cache)?;
        Digest::parse_bytes(&content)
            .map(Some)
            .map_err(|source| TagStoreError::MalformedDigest {
                tier: Tier::Disk,
                source,
            })
    }
}

/// Resolves tags from the backend, writing hits through to the local cache.
pub struct BackendTierResolver {
    fs: Arc<dyn FileStore>,
    backends: Arc<dyn BackendResolver>,
}

impl BackendTierResolver {
    #[must_use]
    pub fn new(fs: Arc<dyn FileStore>, backends: Arc<dyn BackendResolver>) -> Self {
        Self { fs, backends }
    }
}

impl TagResolver for BackendTierResolver {
    fn tier(&self) -> Tier {
        Tier::Backend
    }

    fn resolve(&self, tag: &str) -> Result<Option<Digest>, TagStoreError> {
        let client = self
            .backends
            .get_client(tag)
            .map_err(TagStoreError::BackendManager)?;

        let mut content = Vec::new();
        match client.download(tag, &mut content) {
            Ok(()) => {}
            Err(e) if e.is_blob_not_found() => return Ok(None),
            Err(e) => return Err(TagStoreError::BackendClient(e)),
        }

        let digest =
            Digest::parse_bytes(&content).map_err(|source| TagStoreError::MalformedDigest {
                tier: Tier::Backend,
                source,
            })?;

        // Best effort: the digest is already resolved.
        if let Err(e) = write_tag_to_disk(self.fs.as_ref(), tag, &digest) {
            warn!(tag, error = %e, "Error writing tag to disk");
        }
        Ok(Some(digest))
    }
}

// =============================================================================
// TAG STORE
// =============================================================================

/// The two-tier tag store.
///
/// Holds no locks of its own; concurrency guarantees come from the
/// collaborators. Concurrent `put`s of different digests for one tag leave
/// whichever entry the cache created first.
pub struct TagStore {
    fs: Arc<dyn FileStore>,
    write_back: Arc<dyn WriteBackScheduler>,
    resolvers: Vec<Box<dyn TagResolver>>,
}

impl std::fmt::Debug for TagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<Tier> = self.resolvers.iter().map(|r| r.tier()).collect();
        f.debug_struct("TagStore")
            .field("tiers", &tiers)
            .finish_non_exhaustive()
    }
}

impl TagStore {
    /// Create a store resolving from the local cache, then the backend.
    #[must_use]
    pub fn new(
        fs: Arc<dyn FileStore>,
        backends: Arc<dyn BackendResolver>,
        write_back: Arc<dyn WriteBackScheduler>,
    ) -> Self {
        let resolvers: Vec<Box<dyn TagResolver>> = vec![
            Box::new(DiskResolver::new(Arc::clone(&fs))),
            Box::new(BackendTierResolver::new(Arc::clone(&fs), backends)),
        ];
        Self::with_resolvers(fs, write_back, resolvers)
    }

    /// Create a store with a custom resolution chain, tried in order.
    #[must_use]
    pub fn with_resolvers(
        fs: Arc<dyn FileStore>,
        write_back: Arc<dyn WriteBackScheduler>,
        resolvers: Vec<Box<dyn TagResolver>>,
    ) -> Self {
        Self {
            fs,
            write_back,
            resolvers,
        }
    }

    /// Tiers in resolution order.
    #[must_use]
    pub fn tiers(&self) -> Vec<Tier> {
        self.resolvers.iter().map(|r| r.tier()).collect()
    }
}

impl Store for TagStore {
    fn put(
        &self,
        tag: &str,
        digest: &Digest,
        write_back_delay: Duration,
    ) -> Result<(), TagStoreError> {
        validate_tag(tag)?;

        write_tag_to_disk(self.fs.as_ref(), tag, digest).map_err(TagStoreError::WriteTag)?;
        self.fs
            .set_cache_file_metadata(tag, &Persist(true))
            .map_err(TagStoreError::SetPersistMetadata)?;
        self.write_back
            .add(WriteBackTask::with_delay(tag, tag, write_back_delay))
            .map_err(TagStoreError::Enqueue)?;

        debug!(
            tag,
            %digest,
            delay = ?write_back_delay,
            "Tag put, write-back scheduled"
        );
        Ok(())
    }

    fn get(&self, tag: &str) -> Result<Digest, TagStoreError> {
        validate_tag(tag)?;

        for resolver in &self.resolvers {
            if let Some(digest) = resolver.resolve(tag)? {
                debug!(tag, %digest, tier = %resolver.tier(), "Tag resolved");
                return Ok(digest);
            }
        }
        Err(TagStoreError::TagNotFound)
    }
}

// =============================================================================
// TESTS
// =============================================================================
