//! Tests for teamdb-remote: the HTTP client against an in-process mock store

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teamdb_core::Record;
use teamdb_remote::*;

const API_KEY: &str = "secret";

#[derive(Default)]
struct Mock {
    /// Number of leading requests answered with 503.
    fail_first: AtomicU32,
    calls: AtomicU32,
    uploads: Mutex<Vec<(String, Value)>>,
    index: Mutex<Option<Value>>,
}

impl Mock {
    fn should_fail(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn index(State(mock): State<Arc<Mock>>) -> Result<Json<Value>, StatusCode> {
    if mock.should_fail() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!([
        {"author": "Alice", "description": "vape", "hash": "v1",
         "config": "options iteration=50;", "dps": 31000.5, "viewer_key": "perm_a"},
        {"author": "Bob", "description": "", "hash": "", "config": "", "dps": 0.0, "viewer_key": ""}
    ])))
}

async fn key(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if mock.should_fail() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let advisory = headers
        .get("viewer_key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.uploads.lock().unwrap().push((advisory.clone(), body));
    Ok(Json(json!({ "id": format!("perm_{}", advisory) })))
}

async fn db(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    *mock.index.lock().unwrap() = Some(body);
    StatusCode::OK
}

async fn share(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    if id != "perm_AY1M" {
        return Err(StatusCode::NOT_FOUND);
    }
    let payload = json!({
        "config_file": "options iteration=50 workers=4;",
        "char_details": [],
        "dps": {"mean": 100.0},
        "target_count": 1
    });
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload.to_string().as_bytes()).unwrap();
    let blob = codec::encode(&encoder.finish().unwrap());
    Ok(Json(json!({ "data": blob })))
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn store_server(mock: Arc<Mock>) -> String {
    let app = Router::new()
        .route("/index", get(index))
        .route("/key", post(key))
        .route("/db", post(db))
        .with_state(mock);
    spawn(app).await
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        multiplier: 2.0,
        max_delay: Duration::from_millis(20),
    }
}

// ===========================================================================
// Index
// ===========================================================================

#[tokio::test]
async fn fetch_index_decodes_entries() {
    let mock = Arc::new(Mock::default());
    let store = HttpRemoteStore::new(store_server(mock).await);

    let entries = store.fetch_index().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].author, "Alice");
    assert_eq!(entries[0].viewer_key, "perm_a");
    assert_eq!(entries[0].dps, 31000.5);
    assert!(entries[1].config.is_empty());
}

#[tokio::test]
async fn fetch_index_retries_transient_failures() {
    let mock = Arc::new(Mock { fail_first: AtomicU32::new(2), ..Default::default() });
    let store = HttpRemoteStore::new(store_server(mock.clone()).await).with_retry(fast_retry());

    let entries = store.fetch_index().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fetch_index_gives_up_after_retries() {
    let mock = Arc::new(Mock { fail_first: AtomicU32::new(10), ..Default::default() });
    let store = HttpRemoteStore::new(store_server(mock.clone()).await).with_retry(fast_retry());

    let err = store.fetch_index().await.unwrap_err();
    match err {
        RemoteError::Status { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Status, got {:?}", other),
    }
    assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn upload_index_sends_records_without_transient_fields() {
    let mock = Arc::new(Mock::default());
    let store = HttpRemoteStore::new(store_server(mock.clone()).await).with_api_key(API_KEY);

    let mut record = Record::new("active bennett;", "Alice", "vape")
        .with_location("db/Bennett/bnpmpmxl.yaml");
    record.viewer_key = "perm_1".into();
    record.changed = true;
    store.upload_index(&[record]).await.unwrap();

    let index = mock.index.lock().unwrap().clone().unwrap();
    assert_eq!(index[0]["viewer_key"], "perm_1");
    assert_eq!(index[0]["author"], "Alice");
    assert!(index[0].get("location").is_none());
    assert!(index[0].get("changed").is_none());
}

#[tokio::test]
async fn upload_index_with_wrong_key_is_not_retried() {
    let mock = Arc::new(Mock::default());
    let store = HttpRemoteStore::new(store_server(mock.clone()).await)
        .with_api_key("wrong")
        .with_retry(fast_retry());

    let err = store.upload_index(&[]).await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 401, .. }));
    assert!(!err.is_transient());
    assert!(mock.index.lock().unwrap().is_none());
}

// ===========================================================================
// Artifact upload
// ===========================================================================

#[tokio::test]
async fn upload_result_returns_server_id() {
    let mock = Arc::new(Mock::default());
    let store = HttpRemoteStore::new(store_server(mock.clone()).await).with_api_key(API_KEY);

    let upload = ResultUpload {
        data: codec::encode(b"\x1f\x8bgz"),
        author: "Alice and Bob".into(),
        description: "team database".into(),
    };
    let id = store.upload_result(&upload, "abc123").await.unwrap();
    assert_eq!(id, "perm_abc123");

    let uploads = mock.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "abc123");
    assert_eq!(uploads[0].1["author"], "Alice and Bob");
    assert_eq!(uploads[0].1["description"], "team database");
    assert_eq!(uploads[0].1["data"], upload.data);
}

#[tokio::test]
async fn upload_result_without_api_key_fails_locally() {
    let mock = Arc::new(Mock::default());
    let store = HttpRemoteStore::new(store_server(mock.clone()).await);

    let upload = ResultUpload {
        data: String::new(),
        author: String::new(),
        description: String::new(),
    };
    let err = store.upload_result(&upload, "k").await.unwrap_err();
    assert!(matches!(err, RemoteError::MissingApiKey(_)));
    assert_eq!(mock.calls.load(Ordering::SeqCst), 0);

    let core: teamdb_core::Error = err.into();
    assert_eq!(core.kind(), "transport");
}

// ===========================================================================
// Submissions
// ===========================================================================

#[tokio::test]
async fn fetch_submission_resolves_share_reference() {
    let base = spawn(Router::new().route("/:id", get(share))).await;
    let store = HttpRemoteStore::new(base);

    let data = store
        .fetch_submission("https://gcsim.app/viewer/share/perm_AY1M")
        .await
        .unwrap();
    assert_eq!(data.config, "options iteration=50 workers=4;");
    assert_eq!(data.dps.mean, 100.0);
}

#[tokio::test]
async fn fetch_submission_not_found() {
    let base = spawn(Router::new().route("/:id", get(share))).await;
    let store = HttpRemoteStore::new(base);

    let err = store.fetch_submission("https://gcsim.app/viewer/share/nope").await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_store_is_transport_failure() {
    let store = HttpRemoteStore::new("http://127.0.0.1:9")
        .with_retry(RetryPolicy::none())
        .with_timeouts(Timeouts {
            submission: Duration::from_millis(300),
            index: Duration::from_millis(300),
            upload: Duration::from_millis(300),
        });

    let err = store.fetch_index().await.unwrap_err();
    assert!(err.is_transient());
    let core: teamdb_core::Error = err.into();
    assert_eq!(core.kind(), "transport");
}
