//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the gateway.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Huffman Gateway",
        version = "0.1.0",
        description = "Upload a file, run it through the external Huffman codec, download the result."
    ),
    paths(
        crate::routes::jobs::compress,
        crate::routes::jobs::decompress,
        crate::routes::download::download,
    ),
    components(schemas(
        crate::routes::jobs::JobResponse,
        crate::routes::jobs::UploadForm,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "jobs", description = "Compression and decompression jobs"),
        (name = "artifacts", description = "Staged artifact retrieval"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
