//! In-memory local cache.
//!
//! Same contract as `RedbFileStore` without durability. Entries are kept in a
//! `BTreeMap` behind one `RwLock`, which makes create-if-absent atomic.

use super::{FileStore, read_bounded};
use crate::{CacheError, Persist};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct Entry {
    content: Vec<u8>,
    persist: Persist,
}

/// A volatile `FileStore`.
#[derive(Debug, Default)]
pub struct MemFileStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemFileStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.read()?.len())
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Entry>>, CacheError> {
        self.entries
            .read()
            .map_err(|_| CacheError::Io("cache lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Entry>>, CacheError> {
        self.entries
            .write()
            .map_err(|_| CacheError::Io("cache lock poisoned".to_string()))
    }
}

impl FileStore for MemFileStore {
    fn create_cache_file(&self, name: &str, content: &mut dyn Read) -> Result<(), CacheError> {
        let content = read_bounded(name, content)?;
        let mut entries = self.write()?;
        if entries.contains_key(name) {
            return Err(CacheError::AlreadyExists(name.to_string()));
        }
        entries.insert(
            name.to_string(),
            Entry {
                content,
                persist: Persist::default(),
            },
        );
        Ok(())
    }

    fn set_cache_file_metadata(&self, name: &str, md: &Persist) -> Result<bool, CacheError> {
        let mut entries = self.write()?;
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        let changed = entry.persist != *md;
        entry.persist = *md;
        Ok(changed)
    }

    fn get_cache_file_metadata(&self, name: &str) -> Result<Persist, CacheError> {
        self.read()?
            .get(name)
            .map(|e| e.persist)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))
    }

    fn get_cache_file_reader(&self, name: &str) -> Result<Box<dyn Read + Send>, CacheError> {
        let content = self
            .read()?
            .get(name)
            .map(|e| e.content.clone())
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(content)))
    }
}
