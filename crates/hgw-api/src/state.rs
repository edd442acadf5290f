//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Holds the job pipeline (which owns the artifact
//! store and the codec), metrics, and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use hgw_core::{ArtifactError, ArtifactStore, Codec, JobPipeline, ProcessCodec};
use thiserror::Error;

use crate::config::{self, AppConfig, ConfigError};
use crate::middleware::metrics::ApiMetrics;

/// Errors during startup. Any of these aborts the process.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("staging directory: {0}")]
    Staging(#[from] ArtifactError),
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: JobPipeline,
    pub metrics: ApiMetrics,
    pub config: AppConfig,
    /// Executable checked by the readiness probe. `None` for in-process codecs.
    pub codec_executable: Option<PathBuf>,
}

impl AppState {
    /// Build state around an arbitrary codec.
    pub fn new(config: AppConfig, codec: Arc<dyn Codec>) -> Result<Self, ArtifactError> {
        let store = ArtifactStore::new(&config.staging_dir)?;
        Ok(Self {
            pipeline: JobPipeline::new(store, codec),
            metrics: ApiMetrics::new(),
            config,
            codec_executable: None,
        })
    }

    /// Build production state: locate the codec executable and fail if it is
    /// missing, then create and canonicalize the staging directory.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, BootstrapError> {
        let executable = config::locate_codec(config.codec_path.as_deref())?;
        tracing::info!(codec = %executable.display(), "codec executable located");

        let store = ArtifactStore::open(&config.staging_dir).await?;
        tracing::info!(
            staging_dir = %store.root().display(),
            "artifact staging configured"
        );

        let codec = Arc::new(ProcessCodec::new(executable.clone()));
        Ok(Self {
            pipeline: JobPipeline::new(store, codec),
            metrics: ApiMetrics::new(),
            config,
            codec_executable: Some(executable),
        })
    }
}
