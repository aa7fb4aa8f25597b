//! # API Request/Response Types
//!
//! JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// TAG REQUEST/RESPONSE
// =============================================================================

/// Body of `PUT /tags/{tag}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutTagRequest {
    /// Canonical digest, `sha256:<hex>`.
    pub digest: String,
    /// Seconds before the write-back may run; server default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_back_delay_secs: Option<u64>,
}

/// A resolved or stored mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub tag: String,
    pub digest: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
