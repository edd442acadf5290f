//! # Compress / Decompress Endpoints
//!
//! Each request is one job: the multipart `file` field is staged, the codec
//! runs, and the response names the artifact to download. Jobs share fixed
//! artifact slots, so the latest job of a kind wins.

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use hgw_core::CodecMode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Successful job response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    /// e.g. "Compression successful!"
    pub message: String,
    /// Relative URL of the output artifact.
    pub download_link: String,
    /// File name of the output artifact.
    pub filename: String,
}

/// Multipart request body.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// File to transform.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/compress", post(compress))
        .route("/decompress", post(decompress))
}

/// POST /compress — Huffman-encode the uploaded file.
#[utoipa::path(
    post,
    path = "/compress",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Compressed", body = JobResponse),
        (status = 400, description = "No file uploaded", body = crate::error::ErrorBody),
        (status = 413, description = "Upload exceeds the configured size limit", body = crate::error::ErrorBody),
        (status = 500, description = "Codec failed", body = crate::error::ErrorBody),
    ),
    tag = "jobs"
)]
async fn compress(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<JobResponse>, AppError> {
    run_job(state, CodecMode::Compress, multipart).await
}

/// POST /decompress — decode a previously compressed file.
#[utoipa::path(
    post,
    path = "/decompress",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Decompressed", body = JobResponse),
        (status = 400, description = "No file uploaded", body = crate::error::ErrorBody),
        (status = 413, description = "Upload exceeds the configured size limit", body = crate::error::ErrorBody),
        (status = 500, description = "Codec failed", body = crate::error::ErrorBody),
    ),
    tag = "jobs"
)]
async fn decompress(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<JobResponse>, AppError> {
    run_job(state, CodecMode::Decompress, multipart).await
}

async fn run_job(
    state: AppState,
    mode: CodecMode,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<JobResponse>, AppError> {
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await?,
        Err(rejection) => {
            tracing::debug!(%rejection, "request is not multipart");
            None
        }
    };

    // The job runs on its own task so a dropped connection cannot cancel a
    // codec process that has already started.
    let pipeline = state.pipeline.clone();
    let outcome = tokio::spawn(async move { pipeline.run(mode, upload.as_deref()).await })
        .await
        .map_err(|e| AppError::Internal(format!("job task failed: {e}")))?;

    state.metrics.record_job(mode, outcome.is_ok());
    let report = outcome?;

    Ok(Json(JobResponse {
        message: format!("{} successful!", mode.verb()),
        download_link: report.download_link,
        filename: report.filename,
    }))
}

/// Pull the `file` field out of the form.
///
/// A `file` part with an empty file name is an empty file picker and counts as
/// no upload.
async fn read_upload(mut multipart: Multipart) -> Result<Option<Bytes>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if field.file_name().map_or(true, str::is_empty) {
            return Ok(None);
        }
        return Ok(Some(field.bytes().await?));
    }
    Ok(None)
}
