//! # Request and Job Metrics
//!
//! Lightweight in-process counters using atomics, rendered in Prometheus
//! text exposition format at `/metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use hgw_core::CodecMode;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    /// Indexed by `[mode][succeeded as usize]`.
    jobs: [[AtomicU64; 2]; 2],
}

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    inner: Arc<Counters>,
}

fn mode_index(mode: CodecMode) -> usize {
    match mode {
        CodecMode::Compress => 0,
        CodecMode::Decompress => 1,
    }
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return current request count.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Return current count of 4xx/5xx responses.
    pub fn errors(&self) -> u64 {
        self.inner.errors.load(Ordering::Relaxed)
    }

    /// Record the end of a job.
    pub fn record_job(&self, mode: CodecMode, succeeded: bool) {
        self.inner.jobs[mode_index(mode)][succeeded as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Number of jobs finished in `mode` with the given outcome.
    pub fn jobs(&self, mode: CodecMode, succeeded: bool) -> u64 {
        self.inner.jobs[mode_index(mode)][succeeded as usize].load(Ordering::Relaxed)
    }

    /// Render all counters in Prometheus text format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# TYPE hgw_http_requests_total counter");
        let _ = writeln!(out, "hgw_http_requests_total {}", self.requests());
        let _ = writeln!(out, "# TYPE hgw_http_errors_total counter");
        let _ = writeln!(out, "hgw_http_errors_total {}", self.errors());
        let _ = writeln!(out, "# TYPE hgw_jobs_total counter");
        for mode in [CodecMode::Compress, CodecMode::Decompress] {
            for (succeeded, outcome) in [(true, "succeeded"), (false, "failed")] {
                let _ = writeln!(
                    out,
                    "hgw_jobs_total{{mode=\"{mode}\",outcome=\"{outcome}\"}} {}",
                    self.jobs(mode, succeeded)
                );
            }
        }
        out
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.inner.requests.fetch_add(1, Ordering::Relaxed);
        if response.status().is_server_error() || response.status().is_client_error() {
            m.inner.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
