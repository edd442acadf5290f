//! # Integration Tests for hgw-api
//!
//! Drives the full router with in-process codecs: compress/decompress jobs,
//! missing uploads, codec failures, artifact download and traversal
//! rejection, health probes, metrics, and the OpenAPI document.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use hgw_api::config::AppConfig;
use hgw_api::error::ErrorBody;
use hgw_api::routes::jobs::JobResponse;
use hgw_api::state::AppState;
use hgw_core::{Codec, CodecError, CodecMode, CodecOutcome};

// -- Fake codecs --------------------------------------------------------------

/// Reversible stand-in for Huffman coding: compress reverses the bytes,
/// decompress reverses them back.
struct ReverseCodec;

#[async_trait]
impl Codec for ReverseCodec {
    async fn run(
        &self,
        _mode: CodecMode,
        input: &Path,
        output: &Path,
    ) -> Result<CodecOutcome, CodecError> {
        let mut bytes = tokio::fs::read(input).await.map_err(CodecError::Wait)?;
        bytes.reverse();
        tokio::fs::write(output, bytes)
            .await
            .map_err(CodecError::Wait)?;
        Ok(CodecOutcome::Succeeded)
    }
}

/// Always exits with the given status and error text.
struct ExitCodec(i32, &'static str);

#[async_trait]
impl Codec for ExitCodec {
    async fn run(&self, _: CodecMode, _: &Path, _: &Path) -> Result<CodecOutcome, CodecError> {
        Ok(CodecOutcome::Failed {
            exit_code: Some(self.0),
            diagnostic: self.1.to_string(),
        })
    }
}

// -- Helpers ------------------------------------------------------------------

struct TestApp {
    dir: tempfile::TempDir,
    router: axum::Router,
}

impl TestApp {
    fn new(codec: Arc<dyn Codec>) -> Self {
        Self::with_config(codec, AppConfig::default())
    }

    fn with_config(codec: Arc<dyn Codec>, config: AppConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            staging_dir: dir.path().join("uploads"),
            ..config
        };
        let state = AppState::new(config, codec).unwrap();
        Self {
            dir,
            router: hgw_api::app(state),
        }
    }

    fn staging(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

const BOUNDARY: &str = "hgw-test-boundary";

fn multipart(uri: &str, field: &str, filename: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// -- Compress / Decompress ----------------------------------------------------

#[tokio::test]
async fn test_compress_returns_download_link() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app
        .send(multipart("/compress", "file", "notes.txt", b"hello huffman"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: JobResponse = json(response).await;
    assert_eq!(body.message, "Compression successful!");
    assert_eq!(body.download_link, "/download/compressed.bin");
    assert_eq!(body.filename, "compressed.bin");

    let staged = std::fs::read(app.staging().join("input.txt")).unwrap();
    assert_eq!(staged, b"hello huffman");
}

#[tokio::test]
async fn test_compress_then_decompress_round_trips() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let original = b"this is an example of a huffman tree".to_vec();

    let response = app
        .send(multipart("/compress", "file", "in.txt", &original))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let compressed = body_bytes(app.send(get("/download/compressed.bin")).await).await;
    assert_ne!(compressed, original);

    let response = app
        .send(multipart("/decompress", "file", "compressed.bin", &compressed))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: JobResponse = json(response).await;
    assert_eq!(body.message, "Decompression successful!");
    assert_eq!(body.download_link, "/download/output.txt");

    let restored = body_bytes(app.send(get(&body.download_link)).await).await;
    assert_eq!(restored, original);
}

#[tokio::test]
async fn test_compress_without_file_field_is_400_and_writes_nothing() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app
        .send(multipart("/compress", "attachment", "in.txt", b"ignored"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "No file uploaded");
    assert!(!app.staging().exists());
}

#[tokio::test]
async fn test_empty_file_name_counts_as_no_file() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app.send(multipart("/compress", "file", "", b"")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_upload_does_not_overwrite_previous_artifact() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    app.send(multipart("/compress", "file", "a.txt", b"keep me"))
        .await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/compress")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let staged = std::fs::read(app.staging().join("input.txt")).unwrap();
    assert_eq!(staged, b"keep me");
}

#[tokio::test]
async fn test_codec_failure_is_500_with_diagnostic() {
    let app = TestApp::new(Arc::new(ExitCodec(2, "Error: Compression failed!")));
    let response = app
        .send(multipart("/compress", "file", "in.txt", b"data"))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "Compression failed: codec exited with status 2");
    assert_eq!(body.details.as_deref(), Some("Error: Compression failed!"));
}

#[tokio::test]
async fn test_upload_over_limit_is_413() {
    let app = TestApp::with_config(
        Arc::new(ReverseCodec),
        AppConfig {
            max_upload_bytes: 1024,
            ..AppConfig::default()
        },
    );

    let response = app
        .send(multipart("/compress", "file", "big.txt", &[b'a'; 4096]))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "Uploaded file is too large");
    assert!(!app.staging().join("input.txt").exists());

    let response = app
        .send(multipart("/compress", "file", "small.txt", &[b'a'; 512]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_decompress_failure_names_decompression() {
    let app = TestApp::new(Arc::new(ExitCodec(1, "")));
    let response = app
        .send(multipart("/decompress", "file", "c.bin", b"garbage"))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: ErrorBody = json(response).await;
    assert!(body.error.starts_with("Decompression failed"));
    assert!(body.details.is_none());
}

#[tokio::test]
async fn test_second_compress_overwrites_first() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    app.send(multipart("/compress", "file", "1.txt", b"first"))
        .await;
    app.send(multipart("/compress", "file", "2.txt", b"second"))
        .await;

    let response = app.send(get("/download/compressed")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"dnoces");
}

// -- Download -----------------------------------------------------------------

#[tokio::test]
async fn test_download_sets_attachment_headers() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    app.send(multipart("/compress", "file", "in.txt", b"abc"))
        .await;

    let response = app.send(get("/download/compressed.bin")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"compressed.bin\""
    );
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(response).await, b"cba");
}

#[tokio::test]
async fn test_download_missing_is_404_and_creates_nothing() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app.send(get("/download/output.txt")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "File not found");
    assert!(!app.staging().exists());
}

#[tokio::test]
async fn test_download_traversal_is_rejected() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    std::fs::write(app.dir.path().join("secret"), b"top secret").unwrap();
    std::fs::create_dir_all(app.staging()).unwrap();

    for uri in ["/download/..%2Fsecret", "/download/../secret", "/download/a/b"] {
        let response = app.send(get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_bytes(response).await;
        assert!(!body.windows(10).any(|w| w == b"top secret"), "{uri}");
    }
}

// -- Probes, metrics, OpenAPI -------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app.send(get("/health/liveness")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app.send(get("/health/readiness")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ready");
}

#[tokio::test]
async fn test_readiness_fails_when_staging_path_is_a_file() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    std::fs::write(app.staging(), b"not a directory").unwrap();
    let response = app.send(get("/health/readiness")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_count_jobs() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    app.send(multipart("/compress", "file", "in.txt", b"x"))
        .await;
    app.send(multipart("/compress", "nope", "in.txt", b"x"))
        .await;

    let text = String::from_utf8(body_bytes(app.send(get("/metrics")).await).await).unwrap();
    assert!(text.contains("hgw_jobs_total{mode=\"compress\",outcome=\"succeeded\"} 1"));
    assert!(text.contains("hgw_jobs_total{mode=\"compress\",outcome=\"failed\"} 1"));
    assert!(text.contains("hgw_http_requests_total 2"));
    assert!(text.contains("hgw_http_errors_total 1"));
}

#[tokio::test]
async fn test_openapi_json() {
    let app = TestApp::new(Arc::new(ReverseCodec));
    let response = app.send(get("/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let spec: serde_json::Value = json(response).await;
    assert!(spec["paths"]["/compress"].is_object());
    assert!(spec["paths"]["/download/{filename}"].is_object());
}

// -- Startup ------------------------------------------------------------------

#[tokio::test]
async fn test_bootstrap_fails_without_codec() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        staging_dir: dir.path().join("uploads"),
        codec_path: Some(dir.path().join("missing-codec")),
        ..AppConfig::default()
    };
    let err = AppState::bootstrap(config).await.unwrap_err();
    assert!(err.to_string().contains("codec executable not found"));
}

#[cfg(unix)]
fn write_codec_script(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let codec = dir.join("main");
    std::fs::write(&codec, "#!/bin/sh\ncp \"$2\" \"$3\"\n").unwrap();
    std::fs::set_permissions(&codec, std::fs::Permissions::from_mode(0o755)).unwrap();
    codec
}

#[cfg(unix)]
#[tokio::test]
async fn test_bootstrap_with_executable_codec() {
    let dir = tempfile::tempdir().unwrap();
    let codec = write_codec_script(dir.path());

    let config = AppConfig {
        staging_dir: dir.path().join("nested").join("..").join("uploads"),
        codec_path: Some(codec.clone()),
        ..AppConfig::default()
    };
    let state = AppState::bootstrap(config).await.unwrap();
    assert_eq!(state.codec_executable.as_deref(), Some(codec.as_path()));

    let root = state.pipeline.store().root();
    assert!(root.is_dir());
    assert_eq!(root, std::fs::canonicalize(dir.path()).unwrap().join("uploads"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_readiness_fails_when_codec_loses_execute_bit() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let codec = write_codec_script(dir.path());
    let config = AppConfig {
        staging_dir: dir.path().join("uploads"),
        codec_path: Some(codec.clone()),
        ..AppConfig::default()
    };
    let router = hgw_api::app(AppState::bootstrap(config).await.unwrap());

    let response = router.clone().oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    std::fs::set_permissions(&codec, std::fs::Permissions::from_mode(0o644)).unwrap();
    let response = router.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
