//! # Configuration
//!
//! TOML configuration for the tagstore binary.
//!
//! ```toml
//! cache_path = "tagstore-cache.redb"
//! queue_path = "tagstore-queue.redb"
//!
//! [[backends]]
//! namespace = "library/.*"
//! kind = "fs"
//! root = "/var/lib/tagstore/library"
//!
//! [write_back]
//! default_delay_secs = 30
//! poll_interval_ms = 1000
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! A missing file yields the defaults. `TAGSTORE_API_KEY` overrides
//! `server.api_key`.

use crate::error::AppError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tagstore_core::{
    BackendManager, FileStore, FsBackend, MemBackend, MemFileStore, RedbFileStore, RedbTaskQueue,
    RetryPolicy,
    primitives::{
        DEFAULT_RETRY_INITIAL_DELAY, DEFAULT_RETRY_MAX_DELAY, DEFAULT_RETRY_MULTIPLIER,
        DEFAULT_WRITE_BACK_DELAY,
    },
};

/// Environment variable overriding the configured API key.
pub const API_KEY_ENV: &str = "TAGSTORE_API_KEY";

// =============================================================================
// CONFIG STRUCTURE
// =============================================================================

/// Where the local cache lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// redb file at `cache_path`.
    #[default]
    Redb,
    /// Volatile; the write-back queue is kept in memory as well.
    Memory,
}

/// Kind of backend client behind a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Directory of blob files under `root`.
    Fs,
    /// Process-local map, lost on exit.
    Memory,
}

/// One `[[backends]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Regex matched against the whole tag.
    pub namespace: String,
    pub kind: BackendKind,
    /// Required for `fs`.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// `[write_back]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteBackConfig {
    pub default_delay_secs: u64,
    pub poll_interval_ms: u64,
    pub initial_retry_ms: u64,
    pub max_retry_ms: u64,
    pub retry_multiplier: u32,
    /// Unlimited when absent.
    pub max_failures: Option<u32>,
}

impl Default for WriteBackConfig {
    fn default() -> Self {
        Self {
            default_delay_secs: DEFAULT_WRITE_BACK_DELAY.as_secs(),
            poll_interval_ms: 1000,
            initial_retry_ms: u64::try_from(DEFAULT_RETRY_INITIAL_DELAY.as_millis()).unwrap_or(u64::MAX),
            max_retry_ms: u64::try_from(DEFAULT_RETRY_MAX_DELAY.as_millis()).unwrap_or(u64::MAX),
            retry_multiplier: DEFAULT_RETRY_MULTIPLIER,
            max_failures: None,
        }
    }
}

impl WriteBackConfig {
    /// Delay applied when a put does not name one.
    #[must_use]
    pub fn default_delay(&self) -> Duration {
        Duration::from_secs(self.default_delay_secs)
    }

    /// Worker tick interval, never below one millisecond.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.initial_retry_ms),
            max_delay: Duration::from_millis(self.max_retry_ms),
            multiplier: self.retry_multiplier,
            max_failures: self.max_failures,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cache: CacheMode,
    pub cache_path: PathBuf,
    pub queue_path: PathBuf,
    pub backends: Vec<BackendConfig>,
    pub write_back: WriteBackConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheMode::Redb,
            cache_path: PathBuf::from("tagstore-cache.redb"),
            queue_path: PathBuf::from("tagstore-queue.redb"),
            backends: vec![BackendConfig {
                namespace: ".*".to_string(),
                kind: BackendKind::Fs,
                root: Some(PathBuf::from("tagstore-backend")),
            }],
            write_back: WriteBackConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse TOML content.
    pub fn parse(content: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(content).map_err(|e| AppError::Config(e.to_string()))?;
        for backend in &config.backends {
            if backend.kind == BackendKind::Fs && backend.root.is_none() {
                return Err(AppError::Config(format!(
                    "backend {:?}: kind \"fs\" requires root",
                    backend.namespace
                )));
            }
        }
        Ok(config)
    }

    /// API key from the environment, else from the file. Empty means disabled.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.server.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    // =========================================================================
    // COLLABORATOR CONSTRUCTION
    // =========================================================================

    /// Open the local cache.
    pub fn open_cache(&self) -> Result<Arc<dyn FileStore>, AppError> {
        let fs: Arc<dyn FileStore> = match self.cache {
            CacheMode::Redb => Arc::new(RedbFileStore::open(&self.cache_path)?),
            CacheMode::Memory => Arc::new(MemFileStore::new()),
        };
        Ok(fs)
    }

    /// Open the write-back queue.
    pub fn open_queue(&self) -> Result<Arc<RedbTaskQueue>, AppError> {
        Ok(Arc::new(match self.cache {
            CacheMode::Redb => RedbTaskQueue::open(&self.queue_path)?,
            CacheMode::Memory => RedbTaskQueue::in_memory()?,
        }))
    }

    /// Register every configured backend, in file order.
    pub fn build_backends(&self) -> Result<Arc<BackendManager>, AppError> {
        let mut manager = BackendManager::new();
        for backend in &self.backends {
            match (backend.kind, &backend.root) {
                (BackendKind::Fs, Some(root)) => {
                    manager.register(&backend.namespace, Arc::new(FsBackend::new(root)?))?;
                }
                (BackendKind::Fs, None) => {
                    return Err(AppError::Config(format!(
                        "backend {:?}: kind \"fs\" requires root",
                        backend.namespace
                    )));
                }
                (BackendKind::Memory, _) => {
                    manager.register(&backend.namespace, Arc::new(MemBackend::new()))?;
                }
            }
            tracing::info!(namespace = %backend.namespace, kind = ?backend.kind, "Backend registered");
        }
        Ok(manager.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().expect("temp dir");
        let config = Config::load(&temp.path().join("absent.toml")).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.write_back.default_delay(), DEFAULT_WRITE_BACK_DELAY);
    }

    #[test]
    fn parses_full_file() {
        let config = Config::parse(
            r#"
            cache = "memory"
            queue_path = "q.redb"

            [[backends]]
            namespace = "library/.*"
            kind = "fs"
            root = "/srv/library"

            [[backends]]
            namespace = ".*"
            kind = "memory"

            [write_back]
            default_delay_secs = 5
            max_failures = 10

            [server]
            port = 9090
            "#,
        )
        .expect("parse");

        assert_eq!(config.cache, CacheMode::Memory);
        assert_eq!(config.queue_path, PathBuf::from("q.redb"));
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[1].kind, BackendKind::Memory);
        assert_eq!(config.write_back.default_delay(), Duration::from_secs(5));
        assert_eq!(config.write_back.retry_policy().max_failures, Some(10));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn fs_backend_requires_root() {
        let err = Config::parse(
            r#"
            [[backends]]
            namespace = ".*"
            kind = "fs"
            "#,
        )
        .expect_err("missing root");
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("cache_dir = \"x\"").is_err());
    }

    #[test]
    fn backends_register_in_file_order() {
        let temp = tempdir().expect("temp dir");
        let config = Config {
            backends: vec![
                BackendConfig {
                    namespace: "a/.*".to_string(),
                    kind: BackendKind::Fs,
                    root: Some(temp.path().join("a")),
                },
                BackendConfig {
                    namespace: ".*".to_string(),
                    kind: BackendKind::Memory,
                    root: None,
                },
            ],
            ..Config::default()
        };

        let manager = config.build_backends().expect("build");
        assert_eq!(manager.len(), 2);
        assert!(temp.path().join("a").is_dir());
    }
}
