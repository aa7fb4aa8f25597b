//! Wiring of the core collaborators from a `Config`.

use crate::config::Config;
use crate::error::AppError;
use std::sync::Arc;
use tagstore_core::{BackendManager, FileStore, RedbTaskQueue, TagStore, WriteBackExecutor};

/// The opened cache, backends and queue, plus the store and executor over them.
pub struct Services {
    pub fs: Arc<dyn FileStore>,
    pub backends: Arc<BackendManager>,
    pub queue: Arc<RedbTaskQueue>,
    pub store: Arc<TagStore>,
    pub executor: Arc<WriteBackExecutor>,
}

impl Services {
    /// Open every collaborator named by `config`.
    pub fn open(config: &Config) -> Result<Self, AppError> {
        let fs = config.open_cache()?;
        let backends = config.build_backends()?;
        let queue = config.open_queue()?;

        let store = Arc::new(TagStore::new(fs.clone(), backends.clone(), queue.clone()));
        let executor = Arc::new(WriteBackExecutor::new(
            fs.clone(),
            backends.clone(),
            queue.clone(),
            config.write_back.retry_policy(),
        ));

        Ok(Self {
            fs,
            backends,
            queue,
            store,
            executor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, BackendKind, CacheMode};
    use std::time::{Duration, SystemTime};
    use tagstore_core::{Digest, Store};

    #[test]
    fn memory_services_round_trip_through_write_back() {
        let config = Config {
            cache: CacheMode::Memory,
            backends: vec![BackendConfig {
                namespace: ".*".to_string(),
                kind: BackendKind::Memory,
                root: None,
            }],
            ..Config::default()
        };
        let services = Services::open(&config).expect("open");
        let d = Digest::of(b"wired");

        services.store.put("app:1", &d, Duration::ZERO).expect("put");
        assert_eq!(services.queue.len().expect("len"), 1);

        let report = services.executor.run_due(SystemTime::now()).expect("run");
        assert_eq!(report.uploaded, 1);
        assert!(!services.fs.get_cache_file_metadata("app:1").expect("md").is_set());
        assert_eq!(services.backends.len(), 1);
    }
}
