//! HTTP surface tests against an in-memory job store and fake media stages.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

use clippa_api::{create_router, ApiConfig, AppState};
use clippa_db::{JobStore, MemoryJobStore};
use clippa_media::{
    AcquireRequest, MediaAcquirer, MediaError, MediaResult, MediaTranscoder, MetadataConfig,
    MetadataService, MetadataSource, ProgressFn, TranscodeRequest, TtlCache,
};
use clippa_models::{Job, JobStatus, RawFormat, VideoInfo};
use clippa_storage::{BlobStore, StorageResult};
use clippa_worker::{ClipOrchestrator, WorkerConfig};

const SECRET: &str = "test-secret";

struct InstantAcquirer;

#[async_trait]
impl MediaAcquirer for InstantAcquirer {
    async fn acquire(
        &self,
        request: &AcquireRequest,
        _cancel: watch::Receiver<bool>,
        progress: ProgressFn,
    ) -> MediaResult<PathBuf> {
        progress(50);
        tokio::fs::write(&request.output_path, b"media").await?;
        Ok(request.output_path.clone())
    }
}

struct CopyTranscoder;

#[async_trait]
impl MediaTranscoder for CopyTranscoder {
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        _cancel: watch::Receiver<bool>,
        _progress: ProgressFn,
    ) -> MediaResult<PathBuf> {
        tokio::fs::copy(&request.input_path, &request.output_path).await?;
        Ok(request.output_path.clone())
    }
}

#[derive(Default)]
struct RecordingBlobStore {
    deleted: Mutex<Vec<String>>,
    signed: Mutex<Vec<(String, String, Duration)>>,
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn upload_file(&self, _path: &Path, key: &str, _content_type: &str) -> StorageResult<String> {
        Ok(format!("https://cdn.test/{}", key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn signed_url(&self, key: &str, filename: &str, ttl: Duration) -> StorageResult<String> {
        self.signed
            .lock()
            .unwrap()
            .push((key.to_string(), filename.to_string(), ttl));
        Ok(format!("https://cdn.test/{}?token=abc", key))
    }
}

struct StaticMetadata;

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn fetch(&self, url: &str) -> MediaResult<VideoInfo> {
        if url.contains("broken") {
            return Err(MediaError::process_failed("yt-dlp", Some(1), "ERROR: Unsupported URL"));
        }
        Ok(VideoInfo {
            id: "abc".to_string(),
            title: "A video".to_string(),
            formats: Some(vec![RawFormat {
                format_id: "137".to_string(),
                ext: Some("mp4".to_string()),
                width: Some(1920),
                height: Some(1080),
                fps: Some(30.0),
                vcodec: Some("avc1.640028".to_string()),
                acodec: Some("none".to_string()),
                ..Default::default()
            }]),
            thumbnail: Some("https://img.test/abc.jpg".to_string()),
            duration: Some(212.0),
            webpage_url: Some(url.to_string()),
        })
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryJobStore>,
    blobs: Arc<RecordingBlobStore>,
    _work_dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(RecordingBlobStore::default());

    let orchestrator = ClipOrchestrator::new(
        store.clone(),
        blobs.clone(),
        Arc::new(InstantAcquirer),
        Arc::new(CopyTranscoder),
        WorkerConfig {
            work_dir: work_dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let metadata_config = MetadataConfig::default();
    let metadata = Arc::new(MetadataService::new(
        Arc::new(StaticMetadata),
        Arc::new(TtlCache::new(metadata_config.cache_ttl)),
        &metadata_config,
    ));
    let config = ApiConfig {
        backend_secret: SECRET.to_string(),
        ..Default::default()
    };

    TestApp {
        router: create_router(AppState::new(config, orchestrator, metadata), None),
        store,
        blobs,
        _work_dir: work_dir,
    }
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", SECRET))
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn ready_job(store: &MemoryJobStore, id: &str) {
    let mut job = Job::new(id, "user-1");
    job.status = JobStatus::Ready;
    job.progress = Some(100);
    job.storage_path = Some(format!("clip-{}.mp4", id));
    job.public_url = Some(format!("https://cdn.test/clip-{}.mp4", id));
    store.insert(job).await;
}

#[tokio::test]
async fn test_public_routes() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Server is alive!");

    let (status, body) = send(&app, Request::get("/api/ping").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();

    let (status, body) = send(&app, Request::get("/api/clip/abc").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized: Missing or invalid token");

    let request = Request::get("/api/clip/abc")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized: Invalid token");
}

#[tokio::test]
async fn test_submit_and_poll_clip() {
    let app = test_app();

    let request = authed("POST", "/api/clip")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "url": "https://www.youtube.com/watch?v=abc",
                "startTime": "00:00:10",
                "endTime": "00:00:20",
                "userId": "user-1"
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["id"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..200 {
        let (status, body) = send(&app, authed("GET", &format!("/api/clip/{}", id)).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        last = body;
        if last["status"] != "processing" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(last["status"], "ready");
    assert_eq!(last["progress"], 100);
    assert_eq!(last["url"], format!("https://cdn.test/clip-{}.mp4", id));
    assert_eq!(last["storagePath"], format!("clip-{}.mp4", id));
    assert!(last.get("stage").is_none());
}

#[tokio::test]
async fn test_submit_rejects_invalid_range() {
    let app = test_app();

    let request = authed("POST", "/api/clip")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "url": "https://www.youtube.com/watch?v=abc",
                "startTime": "00:00:20",
                "endTime": "00:00:10",
                "userId": "user-1"
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End time must be after start time");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = test_app();
    let (status, body) = send(&app, authed("GET", "/api/clip/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found");
}

#[tokio::test]
async fn test_signed_url_for_ready_job() {
    let app = test_app();
    ready_job(&app.store, "job1").await;

    let (status, body) = send(
        &app,
        authed("GET", "/api/clip/job1/url?filename=my%20clip.mp4")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://cdn.test/clip-job1.mp4?token=abc");

    let signed = app.blobs.signed.lock().unwrap();
    assert_eq!(
        signed[0],
        ("clip-job1.mp4".to_string(), "my clip.mp4".to_string(), Duration::from_secs(60))
    );
}

#[tokio::test]
async fn test_signed_url_conflict_when_not_ready() {
    let app = test_app();
    app.store.create_job("job1", "user-1").await.unwrap();

    let (status, body) = send(&app, authed("GET", "/api/clip/job1/url").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Job not ready");
}

#[tokio::test]
async fn test_cleanup_deletes_blob_and_record() {
    let app = test_app();
    ready_job(&app.store, "job1").await;

    let (status, body) = send(&app, authed("DELETE", "/api/clip/job1/cleanup").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    assert!(app.store.get_job("job1").await.unwrap().is_none());
    assert_eq!(*app.blobs.deleted.lock().unwrap(), vec!["clip-job1.mp4".to_string()]);
}

#[tokio::test]
async fn test_formats_and_info() {
    let app = test_app();

    let (status, body) = send(
        &app,
        authed("GET", "/api/formats?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "formats": [{ "format_id": "137+bestaudio", "label": "1080p" }] })
    );

    let (status, body) = send(
        &app,
        authed("GET", "/api/info?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "A video");
    assert_eq!(body["duration"], 212.0);
}

#[tokio::test]
async fn test_formats_errors() {
    let app = test_app();

    let (status, body) = send(&app, authed("GET", "/api/formats").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "url is required");

    let (status, body) = send(
        &app,
        authed("GET", "/api/formats?url=https%3A%2F%2Fbroken.test%2Fv")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "yt-dlp exited with code 1: ERROR: Unsupported URL");
}
