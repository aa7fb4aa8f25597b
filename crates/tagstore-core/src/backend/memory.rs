//! In-memory backend client.

use super::BackendClient;
use crate::BackendError;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A volatile backend client.
///
/// Counts downloads and uploads so callers can check which tiers an
/// operation actually touched.
#[derive(Debug, Default)]
pub struct MemBackend {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
}

impl MemBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob directly, bypassing the upload counter.
    pub fn insert(&self, name: &str, content: Vec<u8>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(name.to_string(), content);
        }
    }

    /// Read a blob directly, bypassing the download counter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.read().ok()?.get(name).cloned()
    }

    /// Number of `download` calls so far.
    #[must_use]
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Number of `upload` calls so far.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl BackendClient for MemBackend {
    fn download(&self, name: &str, dst: &mut dyn Write) -> Result<(), BackendError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let blob = self
            .blobs
            .read()
            .map_err(|_| BackendError::Client("backend lock poisoned".to_string()))?
            .get(name)
            .cloned()
            .ok_or(BackendError::BlobNotFound)?;
        dst.write_all(&blob)?;
        Ok(())
    }

    fn upload(&self, name: &str, src: &mut dyn Read) -> Result<(), BackendError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let mut content = Vec::new();
        src.read_to_end(&mut content)?;
        self.blobs
            .write()
            .map_err(|_| BackendError::Client("backend lock poisoned".to_string()))?
            .insert(name.to_string(), content);
        Ok(())
    }
}
