//! # API Route Modules
//!
//! - `jobs` — `POST /compress` and `POST /decompress`, one codec job per request.
//! - `download` — `GET /download/{filename}`, serves staged artifacts.

pub mod download;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// All job and artifact routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .merge(download::router())
}
