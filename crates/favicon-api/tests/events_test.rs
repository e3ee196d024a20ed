//! HTTP surface of the favicon service against in-memory storage and records.
//!
//! Run with: `cargo test -p favicon-api --test events_test`

use std::io::Cursor;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use favicon_api::{build_router, AppState};
use favicon_services::test_helpers::{MockRecordStore, MockStorage};
use favicon_services::{FaviconPipeline, PipelineSettings};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};

struct TestApp {
    server: TestServer,
    storage: Arc<MockStorage>,
    records: Arc<MockRecordStore>,
    _tmp: tempfile::TempDir,
}

fn setup_test_app() -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MockStorage::new());
    let records = Arc::new(MockRecordStore::new());
    let pipeline = FaviconPipeline::new(
        storage.clone(),
        records.clone(),
        PipelineSettings {
            tmp_root: Some(tmp.path().to_path_buf()),
            ..Default::default()
        },
    );
    let state = Arc::new(AppState::new(pipeline, storage.clone()));
    let server = TestServer::new(build_router(state)).unwrap();

    TestApp {
        server,
        storage,
        records,
        _tmp: tmp,
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 255]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

#[tokio::test]
async fn test_liveness() {
    let app = setup_test_app();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let app = setup_test_app();
    let response = app.server.get("/health/ready").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["database"], "not_configured");
    assert_eq!(body["storage"], "local");
}

#[tokio::test]
async fn test_non_image_event_is_ignored() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/events/storage/finalize")
        .json(&json!({
            "bucket": "site-assets",
            "name": "siteImages/favicon_1.txt",
            "contentType": "text/plain",
            "size": "12"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({ "outcome": "ignored", "reason": "not_an_image" })
    );
    assert_eq!(app.storage.write_count(), 0);
    assert_eq!(app.records.mutation_count(), 0);
}

#[tokio::test]
async fn test_image_event_completes_run() {
    let app = setup_test_app();
    app.storage
        .set_file("siteImages/favicon_5.png", png(200, 120), "image/png");

    let response = app
        .server
        .post("/events/storage/finalize")
        .json(&json!({
            "bucket": "site-assets",
            "name": "siteImages/favicon_5.png",
            "contentType": "image/png",
            "size": "2048"
        }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["resolution"], "created");
    assert_eq!(body["objectPath"], "siteImages/favicon_5.png");
    assert_eq!(body["files"].as_object().unwrap().len(), 6);
    assert_eq!(app.storage.keys_with_prefix("public/favicon/").len(), 6);
    assert_eq!(app.records.len(), 1);
}

#[tokio::test]
async fn test_missing_source_returns_500_with_stage() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/events/storage/finalize")
        .json(&json!({
            "bucket": "site-assets",
            "name": "siteImages/favicon_404.png",
            "contentType": "image/png"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["stage"], "downloaded");
    assert_eq!(body["error_type"], "DOWNLOAD_ERROR");
    assert_eq!(app.records.mutation_count(), 0);
}

#[tokio::test]
async fn test_malformed_event_is_bad_request() {
    let app = setup_test_app();
    let response = app
        .server
        .post("/events/storage/finalize")
        .json(&json!({ "bucket": "site-assets" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_type"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_test_app();

    let response = app
        .server
        .get("/health")
        .add_header("X-Request-ID", "finalize-retry-7")
        .await;
    assert_eq!(response.header("X-Request-ID"), "finalize-retry-7");

    let response = app.server.get("/health").await;
    let generated = response.header("X-Request-ID");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}
