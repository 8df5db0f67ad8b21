//! HttpCatalogClient against a local axum stub of the catalog API.

mod common;

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::write_file;
use lorasync_core::catalog::RetryPolicy;
use lorasync_core::{
    fingerprint, start_sync, CatalogClient, Fingerprint, HttpCatalogClient, SessionState,
    SyncError, SyncEvent, SyncOptions,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const TOKEN: &str = "test-token";
const FLAKY_HASH: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
const BROKEN_HASH: &str = "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

#[derive(Clone)]
struct StubCatalog {
    records: Arc<Mutex<Vec<(String, Value)>>>,
    flaky_calls: Arc<AtomicU32>,
    broken_calls: Arc<AtomicU32>,
}

impl StubCatalog {
    fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            flaky_calls: Arc::new(AtomicU32::new(0)),
            broken_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn insert(&self, hash: &Fingerprint, payload: Value) {
        self.records
            .lock()
            .unwrap()
            .push((hash.to_string(), payload));
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", TOKEN).as_str())
}

async fn by_hash(
    State(stub): State<StubCatalog>,
    UrlPath(hash): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    if hash == FLAKY_HASH {
        if stub.flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
        }
        return Json(json!({"id": 99})).into_response();
    }
    if hash == BROKEN_HASH {
        stub.broken_calls.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::INTERNAL_SERVER_ERROR, "overloaded").into_response();
    }

    let record = stub
        .records
        .lock()
        .unwrap()
        .iter()
        .find(|(h, _)| *h == hash)
        .map(|(_, payload)| payload.clone());
    match record {
        Some(payload) => Json(payload).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Model not found"})),
        )
            .into_response(),
    }
}

async fn file(UrlPath(name): UrlPath<String>) -> Response {
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    format!("bytes of {}", name).into_response()
}

async fn serve(stub: StubCatalog) -> String {
    let app = Router::new()
        .route("/api/v1/model-versions/by-hash/:hash", get(by_hash))
        .route("/files/:name", get(file))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn options(server: &str) -> SyncOptions {
    SyncOptions::new()
        .with_base_url(format!("{}/api/v1", server))
        .with_credential(Some(TOKEN.to_string()))
        .with_request_timeout(Duration::from_secs(5))
}

fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(attempts)
        .with_base_delay(Duration::from_millis(10))
        .with_jitter(false)
}

#[tokio::test]
async fn test_lookup_found_and_not_found() {
    let stub = StubCatalog::new();
    let known = Fingerprint::from_hex("a".repeat(64));
    stub.insert(&known, json!({"id": 5, "images": [{"url": "https://img/x.png"}]}));
    let server = serve(stub).await;
    let client = HttpCatalogClient::new(&options(&server)).unwrap();

    let record = client.lookup_by_fingerprint(&known).await.unwrap().unwrap();
    assert_eq!(record.payload["id"], 5);
    assert_eq!(record.images.len(), 1);

    let unknown = Fingerprint::from_hex("b".repeat(64));
    assert!(client.lookup_by_fingerprint(&unknown).await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_credential_is_rejected() {
    let server = serve(StubCatalog::new()).await;
    let client = HttpCatalogClient::new(&options(&server).with_credential(None)).unwrap();

    let err = client
        .lookup_by_fingerprint(&Fingerprint::from_hex("a".repeat(64)))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Registry { status: 401, .. }));
    assert!(err.is_session_fatal());
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let stub = StubCatalog::new();
    let server = serve(stub.clone()).await;
    let client = HttpCatalogClient::new(&options(&server))
        .unwrap()
        .with_retry_policy(fast_retry(3));

    let record = client
        .lookup_by_fingerprint(&Fingerprint::from_hex(FLAKY_HASH))
        .await
        .unwrap();

    assert!(record.is_some());
    assert_eq!(stub.flaky_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_server_error_surfaces_after_retries() {
    let stub = StubCatalog::new();
    let server = serve(stub.clone()).await;
    let client = HttpCatalogClient::new(&options(&server))
        .unwrap()
        .with_retry_policy(fast_retry(2));

    let err = client
        .lookup_by_fingerprint(&Fingerprint::from_hex(BROKEN_HASH))
        .await
        .unwrap_err();

    match err {
        SyncError::Registry { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stub.broken_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fetch_streams_to_destination() {
    let server = serve(StubCatalog::new()).await;
    let client = HttpCatalogClient::new(&options(&server)).unwrap();
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("sub").join("config.yaml");

    let bytes = client
        .fetch(&format!("{}/files/config.yaml", server), &destination)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        "bytes of config.yaml"
    );
    assert_eq!(bytes, "bytes of config.yaml".len() as u64);
    assert!(!dir.path().join("sub").join("config.yaml.part").exists());
}

#[tokio::test]
async fn test_failed_fetch_leaves_nothing_behind() {
    let server = serve(StubCatalog::new()).await;
    let client = HttpCatalogClient::new(&options(&server)).unwrap();
    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("model.preview.png");

    let err = client
        .fetch(&format!("{}/files/missing.png", server), &destination)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Transport { .. }));
    assert!(!destination.exists());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_start_sync_over_http() {
    let dir = TempDir::new().unwrap();
    let model = write_file(dir.path(), "style.safetensors", b"lora weights");
    write_file(dir.path(), "unknown.safetensors", b"not in catalog");

    let stub = StubCatalog::new();
    let server = serve(stub.clone()).await;
    stub.insert(
        &fingerprint(&model).unwrap(),
        json!({
            "id": 42,
            "name": "Style",
            "files": [
                {"name": "style.safetensors", "downloadUrl": format!("{}/files/style.safetensors", server)},
                {"name": "style.yaml", "downloadUrl": format!("{}/files/style.yaml", server)}
            ],
            "images": [
                {"url": format!("{}/files/first.png?width=450", server)},
                {"url": format!("{}/files/second.webp", server)}
            ]
        }),
    );

    let (events, report) = start_sync(dir.path(), &options(&server))
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.matched, 1);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.previews_written, 2);
    assert_eq!(
        events.last(),
        Some(&SyncEvent::Finished { matched: 1, unmatched: 1 })
    );

    let metadata: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("style.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["id"], 42);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("style.preview.png")).unwrap(),
        "bytes of first.png"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("style.1.preview.webp")).unwrap(),
        "bytes of second.webp"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("style.yaml")).unwrap(),
        "bytes of style.yaml"
    );
    assert_eq!(
        std::fs::read(dir.path().join("style.safetensors")).unwrap(),
        b"lora weights"
    );
}
