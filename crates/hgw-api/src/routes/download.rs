//! # Download Endpoint
//!
//! Serves a staged artifact as an attachment. The name comes straight from the
//! request path, so it is resolved through the artifact store, which rejects
//! anything that is not a single plain file name.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::io::AsyncReadExt;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/download/*filename", get(download))
}

/// GET /download/{filename} — fetch a staged artifact.
#[utoipa::path(
    get,
    path = "/download/{filename}",
    params(("filename" = String, Path, description = "Artifact file name (e.g. compressed.bin) or logical name (e.g. compressed)")),
    responses(
        (status = 200, description = "Artifact contents as an application/octet-stream attachment"),
        (status = 400, description = "Invalid artifact name", body = crate::error::ErrorBody),
        (status = 404, description = "File not found", body = crate::error::ErrorBody),
    ),
    tag = "artifacts"
)]
async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let mut staged = state.pipeline.store().open_for_download(&filename).await?;

    let mut body = Vec::with_capacity(usize::try_from(staged.len).unwrap_or_default());
    staged
        .file
        .read_to_end(&mut body)
        .await
        .map_err(|e| AppError::Internal(format!("reading {}: {e}", staged.file_name)))?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        staged.file_name.replace('"', "\\\"")
    ))
    .map_err(|e| AppError::Internal(format!("content-disposition for {}: {e}", staged.file_name)))?;

    tracing::debug!(artifact = %staged.file_name, bytes = body.len(), "serving artifact");

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
