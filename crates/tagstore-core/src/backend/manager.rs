//! Namespace routing for backend clients.

use super::{BackendClient, BackendResolver};
use crate::BackendError;
use regex::Regex;
use std::sync::Arc;

struct Route {
    namespace: String,
    pattern: Regex,
    client: Arc<dyn BackendClient>,
}

/// Routes tags to backend clients by namespace pattern.
///
/// Patterns are regular expressions matched against the whole tag. Routes are
/// tried in registration order and the first match wins, so more specific
/// namespaces should be registered before catch-alls such as `.*`.
#[derive(Default)]
pub struct BackendManager {
    routes: Vec<Route>,
}

impl std::fmt::Debug for BackendManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces: Vec<&str> = self.routes.iter().map(|r| r.namespace.as_str()).collect();
        f.debug_struct("BackendManager")
            .field("namespaces", &namespaces)
            .finish()
    }
}

impl BackendManager {
    /// Create a manager with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` for tags matching `namespace`.
    pub fn register(
        &mut self,
        namespace: &str,
        client: Arc<dyn BackendClient>,
    ) -> Result<(), BackendError> {
        let pattern = Regex::new(&format!("^(?:{})$", namespace))
            .map_err(|e| BackendError::InvalidNamespace(format!("{}: {}", namespace, e)))?;
        self.routes.push(Route {
            namespace: namespace.to_string(),
            pattern,
            client,
        });
        Ok(())
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl BackendResolver for BackendManager {
    fn get_client(&self, tag: &str) -> Result<Arc<dyn BackendClient>, BackendError> {
        self.routes
            .iter()
            .find(|r| r.pattern.is_match(tag))
            .map(|r| Arc::clone(&r.client))
            .ok_or_else(|| BackendError::NoClient(tag.to_string()))
    }
}
