//! HTTP server & routing integration tests

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{item, test_settings, test_state, PLAYLIST_URL};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use tubeset_app::{build_router, AppState};
use tubeset_common::record::{Collection, Record, ThumbnailDetails, TitleAnalysis};
use tubeset_common::store::Store;

fn router(state: &AppState) -> Router {
    build_router(state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Vec<u8>) {
    send(
        router(state),
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post_json(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = send(
        router(state),
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post_bytes(state: &AppState, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let (status, bytes) = send(
        router(state),
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/zip")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn record(id: &str, views: u64) -> Record {
    Record {
        unique_id: id.to_string(),
        category: "Gaming".to_string(),
        thumbnail_details: ThumbnailDetails::new(format!("images/{}.jpg", id), 1280, 720),
        video_views: views,
        title_analysis: TitleAnalysis {
            title: format!("Title {}", id),
            title_length: 6 + id.len(),
            word_count: 2,
            num_tokens_bert: 2,
            num_tokens_gpt: 2,
        },
        extra: Default::default(),
    }
}

/// Populate the active store of `state`
fn seed(state: &AppState, ids: &[&str]) -> Store {
    let store = state.store();
    store.ensure_layout().unwrap();
    for id in ids {
        fs::write(store.image_path(&format!("{}.jpg", id)), format!("img-{}", id)).unwrap();
    }
    store
        .save(&Collection::from_records(ids.iter().map(|id| record(id, 10)).collect()).unwrap())
        .unwrap();
    store
}

/// Zip of a store holding `ids`
fn package(temp_dir: &TempDir, ids: &[&str]) -> Vec<u8> {
    let root = temp_dir.path().join(format!("pkg_{}", ids.join("_")));
    let store = Store::open(&root);
    store.ensure_layout().unwrap();
    for id in ids {
        fs::write(store.image_path(&format!("{}.jpg", id)), format!("pkg-{}", id)).unwrap();
    }
    store
        .save(&Collection::from_records(ids.iter().map(|id| record(id, 99)).collect()).unwrap())
        .unwrap();
    tubeset_common::package::zip_dir(&root).unwrap()
}

async fn wait_for_ingest(state: &AppState) -> Value {
    for _ in 0..200 {
        let (_, body) = get(state, "/api/ingest/status").await;
        let status = json_body(&body);
        if status["state"] != "running" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("ingestion did not finish");
}

#[tokio::test]
async fn test_root_route_serves_html() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let response = router(&state)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("text/html"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    for section in ["id=\"ingest\"", "id=\"browse\"", "id=\"merge\"", "id=\"download\""] {
        assert!(html.contains(section), "missing section {}", section);
    }
}

#[tokio::test]
async fn test_app_js_served_as_javascript() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let response = router(&state)
        .oneshot(Request::builder().uri("/static/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/javascript"
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let (status, body) = get(&state, "/health").await;
    let health = json_body(&body);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["module"], "tubeset");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
    assert!(health.get("last_error").is_none());
}

#[tokio::test]
async fn test_validate_url() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let (status, body) = post_json(&state, "/api/validate-url", json!({"url": PLAYLIST_URL})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["list_id"], "PLtest_123");

    let (status, body) = post_json(
        &state,
        "/api/validate-url",
        json!({"url": "https://www.youtube.com/watch?v=abc"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body["message"].as_str().unwrap().contains("not a playlist URL"));
}

#[tokio::test]
async fn test_ingest_rejects_invalid_url() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let (status, body) = post_json(&state, "/api/ingest", json!({"url": "ftp://nope"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    assert!(!state.store().exists());
}

#[tokio::test]
async fn test_ingest_runs_in_background_and_reports() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(
        temp_dir.path(),
        vec![item("a1", "Alpha", 5), item("b2", "Beta", 7)],
    );

    let (_, idle) = get(&state, "/api/ingest/status").await;
    assert_eq!(json_body(&idle)["state"], "idle");

    let (status, body) = post_json(&state, "/api/ingest", json!({"url": PLAYLIST_URL})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["run_id"].is_string());

    let finished = wait_for_ingest(&state).await;
    assert_eq!(finished["state"], "completed");
    assert_eq!(finished["run"]["report"]["records_written"], 2);
    assert_eq!(finished["progress"]["processed"], 2);

    let (status, body) = get(&state, "/api/records?sample=10").await;
    assert_eq!(status, StatusCode::OK);
    let records = json_body(&body);
    assert_eq!(records["total"], 2);
    assert_eq!(records["records"].as_array().unwrap().len(), 2);
    let first = &records["records"][0];
    assert!(first["image_url"].as_str().unwrap().starts_with("/images/"));
    assert_eq!(first["category"], "Music");
}

#[tokio::test]
async fn test_ingest_refused_while_store_busy() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let _held = state.store_lock.clone().try_lock_owned().unwrap();
    let (status, body) = post_json(&state, "/api/ingest", json!({"url": PLAYLIST_URL})).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_records_and_stats_without_store() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let (status, body) = get(&state, "/api/records").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["total"], 0);

    let (status, body) = get(&state, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats = json_body(&body);
    assert_eq!(stats["total_entries"], 0);
    assert_eq!(stats["size_mb"], 0.0);
}

#[tokio::test]
async fn test_records_default_sample_size() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    let ids: Vec<String> = (0..20).map(|i| format!("id{:02}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    seed(&state, &id_refs);

    let (_, body) = get(&state, "/api/records").await;
    let records = json_body(&body);
    assert_eq!(records["total"], 20);
    assert_eq!(records["records"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_stats_reports_categories_and_histograms() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    seed(&state, &["x", "y", "z"]);

    let (status, body) = get(&state, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats = json_body(&body);
    assert_eq!(stats["total_entries"], 3);
    assert_eq!(stats["categories"][0]["category"], "Gaming");
    assert_eq!(stats["categories"][0]["count"], 3);
    assert_eq!(stats["views"]["counts"].as_array().unwrap().len(), 20);
    assert_eq!(stats["title_lengths"]["edges"].as_array().unwrap().len(), 21);
}

#[tokio::test]
async fn test_malformed_store_is_unprocessable() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    let store = state.store();
    store.ensure_layout().unwrap();
    fs::write(store.metadata_path(), b"{\"oops\": true}").unwrap();

    let (status, body) = get(&state, "/api/stats").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(&body)["error"]["code"], "MALFORMED");
}

#[tokio::test]
async fn test_image_serving_and_traversal() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    seed(&state, &["pic"]);

    let (status, body) = get(&state, "/images/pic.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"img-pic");

    let (status, _) = get(&state, "/images/absent.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&state, "/images/..").await;
    assert_ne!(status, StatusCode::OK);

    let (status, _) = get(&state, "/images/..%2Fmetadata.json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_merge_upload() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    seed(&state, &["a"]);

    let (status, report) = post_bytes(&state, "/api/merge", package(&temp_dir, &["a", "b"])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["added"], 1);
    assert_eq!(report["skipped_duplicates"], 1);
    assert_eq!(report["images_copied"], 2);
    assert_eq!(report["total_records"], 2);

    let merged = state.store().load().unwrap();
    assert_eq!(merged.records()[0].video_views, 10, "existing record kept");
    assert_eq!(fs::read(state.store().image_path("a.jpg")).unwrap(), b"pkg-a");

    let uploads = state.layout.uploads_path();
    assert_eq!(fs::read_dir(uploads).unwrap().count(), 0);
}

#[tokio::test]
async fn test_merge_rejects_bad_packages() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    seed(&state, &["a"]);

    let (status, body) = post_bytes(&state, "/api/merge", b"definitely not a zip".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PACKAGE");

    let (status, _) = post_bytes(&state, "/api/merge", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, health) = get(&state, "/health").await;
    assert!(json_body(&health)["last_error"]
        .as_str()
        .unwrap()
        .starts_with("Merge failed"));
}

#[tokio::test]
async fn test_merge_upload_over_limit() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = test_settings(temp_dir.path());
    settings.max_upload_mb = 1;
    let state = AppState::new(
        settings,
        helpers::pipeline(
            helpers::fakes::FakeLister::new(vec![]),
            helpers::fakes::FakeThumbnails::new(),
        ),
    );

    let (status, _) = post_bytes(&state, "/api/merge", vec![0u8; 2 * 1024 * 1024]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_download_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let (status, _) = get(&state, "/api/download").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed(&state, &["a"]);
    let response = router(&state)
        .oneshot(Request::builder().uri("/api/download").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "application/zip");
    assert!(response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("database_backup.zip"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let zip_path = temp_dir.path().join("download.zip");
    fs::write(&zip_path, &bytes).unwrap();
    let extracted = temp_dir.path().join("extracted");
    tubeset_common::package::extract(&zip_path, &extracted).unwrap();
    assert_eq!(Store::open(&extracted).load().unwrap().len(), 1);
}

#[tokio::test]
async fn test_download_over_limit() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = test_settings(temp_dir.path());
    settings.max_download_mb = 0;
    let state = AppState::new(
        settings,
        helpers::pipeline(
            helpers::fakes::FakeLister::new(vec![]),
            helpers::fakes::FakeThumbnails::new(),
        ),
    );
    seed(&state, &["a"]);

    let (status, body) = get(&state, "/api/download").await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(&body)["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_delete_and_restore() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);

    let (status, _) = post_json(&state, "/api/delete", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed(&state, &["a", "b"]);
    let (status, body) = post_json(&state, "/api/delete", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
    assert_eq!(body["archived"], true);

    let (_, records) = get(&state, "/api/records").await;
    assert_eq!(json_body(&records)["total"], 0);

    let (status, body) = post_json(&state, "/api/restore", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
    assert_eq!(body["archived"], false);

    let (_, records) = get(&state, "/api/records").await;
    assert_eq!(json_body(&records)["total"], 2);

    let (status, _) = post_json(&state, "/api/restore", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_restore_refused_over_active_store() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(temp_dir.path(), vec![]);
    seed(&state, &["a"]);
    post_json(&state, "/api/delete", json!({})).await;
    seed(&state, &["b"]);

    let (status, body) = post_json(&state, "/api/restore", json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");

    let (_, body) = get(&state, "/api/archive/status").await;
    let status = json_body(&body);
    assert_eq!(status["active"], true);
    assert_eq!(status["archived"], true);
    assert_eq!(status["download_limit_mb"], 1024);
}
