//! # hgw-api — Axum HTTP Surface for the Huffman Gateway
//!
//! Adapts the hgw-core job pipeline and artifact store to HTTP.
//!
//! ## API Surface
//!
//! | Route                     | Module                  | Purpose                         |
//! |---------------------------|-------------------------|---------------------------------|
//! | `POST /compress`          | [`routes::jobs`]        | Stage upload, run codec `c`     |
//! | `POST /decompress`        | [`routes::jobs`]        | Stage upload, run codec `d`     |
//! | `GET /download/{name}`    | [`routes::download`]    | Serve a staged artifact         |
//! | `GET /openapi.json`       | [`openapi`]             | OpenAPI document                |
//! | `GET /health/*`           | this module             | Liveness and readiness probes   |
//! | `GET /metrics`            | [`middleware::metrics`] | Request and job counters        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer (optional) → TraceLayer → MetricsMiddleware → BodyLimit → Handler
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` sit outside the metrics middleware so probe
/// traffic does not inflate request counts.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics));

    let api = if state.config.cors_permissive {
        api.layer(CorsLayer::permissive())
    } else {
        api
    };

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_text));

    Router::new().merge(probes).merge(api).with_state(state)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 503 when the codec executable has disappeared or lost
/// its execute permission since startup or the staging directory path is not usable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(executable) = &state.codec_executable {
        let metadata = tokio::fs::metadata(executable).await.ok();
        if let Err(e) = config::ensure_runnable(executable, metadata.as_ref()) {
            tracing::warn!(error = %e, "codec executable unavailable");
            return (StatusCode::SERVICE_UNAVAILABLE, "codec executable unavailable")
                .into_response();
        }
    }

    if !state.pipeline.store().is_usable().await {
        tracing::warn!(
            staging_dir = %state.pipeline.store().root().display(),
            "staging directory unusable"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "staging directory unusable").into_response();
    }

    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics — counters in Prometheus text exposition format.
async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.render(),
    )
}
