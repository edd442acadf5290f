//! # Middleware
//!
//! - `metrics` — request, error, and job counters.

pub mod metrics;
