//! # redb-backed Local Cache
//!
//! A disk-backed `FileStore` using the redb embedded database.
//!
//! Each cache entry is one row in `cache_files`; its persist flag lives in a
//! separate `persist` table so that flipping the flag never rewrites content.
//! redb serializes writers, which gives create-if-absent and metadata
//! updates their per-name atomicity.

use super::{FileStore, read_bounded};
use crate::{CacheError, Persist};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::io::{Cursor, Read};
use std::path::Path;

/// Table for entry content: name -> bytes
const CACHE_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("cache_files");

/// Table for persist metadata: name -> flag byte
const PERSIST: TableDefinition<&str, u8> = TableDefinition::new("persist");

fn io_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::Io(e.to_string())
}

/// A disk-backed local cache using redb.
pub struct RedbFileStore {
    db: Database,
}

impl std::fmt::Debug for RedbFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbFileStore").finish_non_exhaustive()
    }
}

impl RedbFileStore {
    /// Open or create a cache database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(CACHE_FILES).map_err(io_err)?;
            let _ = write_txn.open_table(PERSIST).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Number of cached entries.
    pub fn len(&self) -> Result<u64, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CACHE_FILES).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    fn exists(&self, name: &str) -> Result<bool, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CACHE_FILES).map_err(io_err)?;
        Ok(table.get(name).map_err(io_err)?.is_some())
    }
}

impl FileStore for RedbFileStore {
    fn create_cache_file(&self, name: &str, content: &mut dyn Read) -> Result<(), CacheError> {
        // Buffer before opening the transaction so a slow reader never
        // holds the single writer slot.
        let buf = read_bounded(name, content)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(CACHE_FILES).map_err(io_err)?;
            let exists = table.get(name).map_err(io_err)?.is_some();
            if exists {
                return Err(CacheError::AlreadyExists(name.to_string()));
            }
            table.insert(name, buf.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn set_cache_file_metadata(&self, name: &str, md: &Persist) -> Result<bool, CacheError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let changed = {
            let files = write_txn.open_table(CACHE_FILES).map_err(io_err)?;
            if files.get(name).map_err(io_err)?.is_none() {
                return Err(CacheError::NotFound(name.to_string()));
            }

            let mut persist = write_txn.open_table(PERSIST).map_err(io_err)?;
            let current = persist
                .get(name)
                .map_err(io_err)?
                .map(|v| Persist::from_byte(v.value()))
                .unwrap_or_default();
            if current == *md {
                false
            } else {
                persist.insert(name, md.to_byte()).map_err(io_err)?;
                true
            }
        };
        write_txn.commit().map_err(io_err)?;
        Ok(changed)
    }

    fn get_cache_file_metadata(&self, name: &str) -> Result<Persist, CacheError> {
        if !self.exists(name)? {
            return Err(CacheError::NotFound(name.to_string()));
        }
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PERSIST).map_err(io_err)?;
        Ok(table
            .get(name)
            .map_err(io_err)?
            .map(|v| Persist::from_byte(v.value()))
            .unwrap_or_default())
    }

    fn get_cache_file_reader(&self, name: &str) -> Result<Box<dyn Read + Send>, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CACHE_FILES).map_err(io_err)?;
        let content = table
            .get(name)
            .map_err(io_err)?
            .map(|v| v.value().to_vec())
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(content)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
