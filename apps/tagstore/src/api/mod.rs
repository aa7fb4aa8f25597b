//! # tagstore HTTP API Module
//!
//! HTTP REST API over the tag store, built on axum.
//!
//! ## Endpoints
//!
//! - `PUT /tags/{tag}` - Store a tag mapping and schedule its write-back
//! - `GET /tags/{tag}` - Resolve a tag (cache, then backend)
//! - `GET /health` - Health check
//!
//! Tags may contain `/`, so the route captures the rest of the path.

mod auth;
mod handlers;
mod types;

pub use handlers::{ApiError, get_tag_handler, health_handler, put_tag_handler};
pub use types::{ErrorResponse, HealthResponse, PutTagRequest, TagResponse};

use crate::error::AppError;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, put},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tagstore_core::Store;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Request bodies carry one digest; anything larger is rejected.
const MAX_BODY_SIZE: usize = 16 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Write-back delay for puts that do not name one.
    pub default_delay: Duration,
    /// Bearer token required on every route but `/health`.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, default_delay: Duration) -> Self {
        Self {
            store,
            default_delay,
            api_key: None,
        }
    }

    /// Require `key` as a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(Arc::from);
        self
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, body limit, authentication.
pub fn create_router(state: AppState) -> Router {
    if state.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication disabled; set TAGSTORE_API_KEY or server.api_key to enable it"
        );
    }

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/tags/{*tag}",
            put(handlers::put_tag_handler).get(handlers::get_tag_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_auth_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn run_server(
    addr: &str,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("bind {}: {}", addr, e)))?;

    tracing::info!("tagstore HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}
