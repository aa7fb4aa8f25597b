//! # API Endpoint Handlers
//!
//! Store calls block on redb and backend I/O, so they run on the blocking
//! pool via `spawn_blocking`.

use super::{
    AppState,
    types::{ErrorResponse, HealthResponse, PutTagRequest, TagResponse},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tagstore_core::{Digest, TagStoreError};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Handler failure, rendered as `ErrorResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// The store rejected or failed the operation.
    Store(TagStoreError),
    /// The request body was invalid.
    BadRequest(String),
    /// The blocking task did not complete.
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Store(TagStoreError::TagNotFound) => StatusCode::NOT_FOUND,
            Self::Store(TagStoreError::InvalidTag(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            Self::Store(e) => e.to_string(),
            Self::BadRequest(msg) | Self::Internal(msg) => msg,
        };
        if status.is_server_error() {
            tracing::error!(%status, error = %error, "Request failed");
        }
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Run a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TagStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {}", e)))?
        .map_err(ApiError::Store)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// TAG HANDLERS
// =============================================================================

/// Store a tag mapping.
pub async fn put_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Json(request): Json<PutTagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let digest = Digest::parse(&request.digest)
        .map_err(|e| ApiError::BadRequest(format!("invalid digest: {}", e)))?;
    let delay = request
        .write_back_delay_secs
        .map(Duration::from_secs)
        .unwrap_or(state.default_delay);

    let store = state.store.clone();
    let key = tag.clone();
    blocking(move || store.put(&key, &digest, delay)).await?;

    Ok(Json(TagResponse {
        tag,
        digest: digest.to_string(),
    }))
}

/// Resolve a tag.
pub async fn get_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<TagResponse>, ApiError> {
    let store = state.store.clone();
    let key = tag.clone();
    let digest = blocking(move || store.get(&key)).await?;

    Ok(Json(TagResponse {
        tag,
        digest: digest.to_string(),
    }))
}
