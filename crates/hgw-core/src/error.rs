//! # Error Hierarchy
//!
//! Structured error types for the gateway core, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each subsystem has its own enum: [`ArtifactError`] for the staging
//! directory, [`CodecError`] for process-level faults of the external codec,
//! and [`JobError`] for the pipeline that composes the two.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecMode;
use crate::pipeline::JobState;

/// Errors raised by the [`ArtifactStore`](crate::artifact::ArtifactStore).
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The requested name would escape the staging directory or is not a
    /// single plain path component.
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),

    /// No artifact is staged under the requested name.
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Filesystem failure while reading or writing an artifact.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Process-level failures of the external codec.
///
/// A codec that runs and exits non-zero is NOT an error at this level; it is a
/// [`CodecOutcome::Failed`](crate::codec::CodecOutcome::Failed).
#[derive(Error, Debug)]
pub enum CodecError {
    /// The executable could not be started.
    #[error("failed to spawn codec {}: {source}", executable.display())]
    Spawn {
        /// Executable that failed to start.
        executable: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Waiting for the process or reading its error stream failed.
    #[error("failed to collect codec exit status: {0}")]
    Wait(#[source] io::Error),
}

/// Terminal failure of a compress or decompress job.
#[derive(Error, Debug)]
pub enum JobError {
    /// The request carried no file payload.
    #[error("No file uploaded")]
    NoFileUploaded,

    /// The codec ran and exited with a non-zero status.
    #[error("{} failed: {}", mode.verb(), describe_exit(exit_code))]
    CodecFailed {
        /// Mode the codec was invoked with.
        mode: CodecMode,
        /// Exit code, or `None` if the process was terminated by a signal.
        exit_code: Option<i32>,
        /// Bounded capture of the codec's error stream.
        diagnostic: String,
    },

    /// Staging the input artifact failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The codec process could not be run at all.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The pipeline attempted an out-of-order state change.
    #[error("invalid job transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// State the job was in.
        from: JobState,
        /// State that was requested.
        to: JobState,
    },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("codec exited with status {code}"),
        None => "codec terminated by signal".to_string(),
    }
}
