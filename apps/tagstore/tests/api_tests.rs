//! Integration tests for the tagstore HTTP API.
//!
//! Uses axum-test to exercise the router without binding a socket.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tagstore::api::{AppState, ErrorResponse, HealthResponse, TagResponse, create_router};
use tagstore_core::{
    BackendManager, Digest, MemBackend, MemFileStore, RedbTaskQueue, RetryPolicy,
    WriteBackExecutor,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Fixture {
    server: TestServer,
    backend: Arc<MemBackend>,
    queue: Arc<RedbTaskQueue>,
    executor: WriteBackExecutor,
}

fn fixture_with(api_key: Option<&str>, routed: bool) -> Fixture {
    let fs = Arc::new(MemFileStore::new());
    let backend = Arc::new(MemBackend::new());
    let mut manager = BackendManager::new();
    if routed {
        manager.register(".*", backend.clone()).unwrap();
    }
    let manager = Arc::new(manager);
    let queue = Arc::new(RedbTaskQueue::in_memory().unwrap());
    let store = Arc::new(tagstore_core::TagStore::new(
        fs.clone(),
        manager.clone(),
        queue.clone(),
    ));
    let executor = WriteBackExecutor::new(fs, manager, queue.clone(), RetryPolicy::test());

    let state = AppState::new(store, Duration::from_secs(30))
        .with_api_key(api_key.map(str::to_string));
    Fixture {
        server: TestServer::new(create_router(state)).unwrap(),
        backend,
        queue,
        executor,
    }
}

fn fixture() -> Fixture {
    fixture_with(None, true)
}

fn digest(content: &str) -> String {
    Digest::of(content.as_bytes()).to_string()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let f = fixture();

    let response = f.server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// PUT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_put_then_get() {
    let f = fixture();
    let d = digest("ubuntu");

    let response = f
        .server
        .put("/tags/library/ubuntu:22.04")
        .json(&json!({ "digest": d }))
        .await;

    response.assert_status_ok();
    let put: TagResponse = response.json();
    assert_eq!(put.tag, "library/ubuntu:22.04");
    assert_eq!(put.digest, d);

    let response = f.server.get("/tags/library/ubuntu:22.04").await;
    response.assert_status_ok();
    assert_eq!(response.json::<TagResponse>(), put);

    // Served locally; nothing uploaded yet
    assert_eq!(f.backend.download_count(), 0);
    assert_eq!(f.backend.upload_count(), 0);
}

#[tokio::test]
async fn test_put_schedules_write_back_with_requested_delay() {
    let f = fixture();
    let before = SystemTime::now();

    f.server
        .put("/tags/app")
        .json(&json!({ "digest": digest("app"), "write_back_delay_secs": 0 }))
        .await
        .assert_status_ok();

    let pending = f.queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].not_before() <= SystemTime::now());
    assert!(pending[0].not_before() >= before);

    let report = f.executor.run_due(SystemTime::now()).unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(f.backend.get("app"), Some(digest("app").into_bytes()));
}

#[tokio::test]
async fn test_put_uses_default_delay() {
    let f = fixture();

    f.server
        .put("/tags/app")
        .json(&json!({ "digest": digest("app") }))
        .await
        .assert_status_ok();

    let pending = f.queue.pending().unwrap();
    assert!(pending[0].not_before() > SystemTime::now() + Duration::from_secs(20));
}

#[tokio::test]
async fn test_put_huge_delay_is_not_due() {
    let f = fixture();

    f.server
        .put("/tags/app")
        .json(&json!({ "digest": digest("app"), "write_back_delay_secs": u64::MAX }))
        .await
        .assert_status_ok();

    let next_year = SystemTime::now() + Duration::from_secs(365 * 24 * 3600);
    assert!(f.queue.due(next_year).unwrap().is_empty());
    let report = f.executor.run_due(SystemTime::now()).unwrap();
    assert_eq!(report.attempted(), 0);
    assert_eq!(f.backend.upload_count(), 0);
}

#[tokio::test]
async fn test_put_invalid_digest_rejected() {
    let f = fixture();

    let response = f
        .server
        .put("/tags/app")
        .json(&json!({ "digest": "sha256:xyz" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert!(body.error.starts_with("invalid digest"));
    assert!(f.queue.is_empty().unwrap());
}

#[tokio::test]
async fn test_put_oversized_tag_rejected() {
    let f = fixture();
    let tag = "a".repeat(2000);

    let response = f
        .server
        .put(&format!("/tags/{}", tag))
        .json(&json!({ "digest": digest("x") }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// GET ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_get_unknown_tag_is_404() {
    let f = fixture();

    let response = f.server.get("/tags/missing").await;

    response.assert_status_not_found();
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "tag not found");
}

#[tokio::test]
async fn test_get_falls_back_to_backend() {
    let f = fixture();
    let d = digest("remote");
    f.backend.insert("remote:1", d.clone().into_bytes());

    let response = f.server.get("/tags/remote:1").await;
    response.assert_status_ok();
    assert_eq!(response.json::<TagResponse>().digest, d);

    // Second read comes from the write-through cache entry
    f.server.get("/tags/remote:1").await.assert_status_ok();
    assert_eq!(f.backend.download_count(), 1);
}

#[tokio::test]
async fn test_get_unroutable_tag_is_500_not_404() {
    let f = fixture_with(None, false);

    let response = f.server.get("/tags/anything").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = response.json();
    assert!(body.error.starts_with("backend manager"));
}

#[tokio::test]
async fn test_get_malformed_backend_content_is_500() {
    let f = fixture();
    f.backend.insert("bad", b"not a digest".to_vec());

    f.server
        .get("/tags/bad")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_missing_token_rejected() {
    let f = fixture_with(Some("secret"), true);

    f.server
        .get("/tags/x")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_wrong_token_rejected() {
    let f = fixture_with(Some("secret"), true);

    f.server
        .get("/tags/x")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong".parse::<HeaderValue>().unwrap(),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_valid_token_accepted() {
    let f = fixture_with(Some("secret"), true);

    f.server
        .put("/tags/x")
        .add_header(
            header::AUTHORIZATION,
            "Bearer secret".parse::<HeaderValue>().unwrap(),
        )
        .json(&json!({ "digest": digest("x") }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_auth_health_always_open() {
    let f = fixture_with(Some("secret"), true);

    f.server.get("/health").await.assert_status_ok();
}
