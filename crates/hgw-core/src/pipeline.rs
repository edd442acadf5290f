//! # Job Pipeline
//!
//! Runs one compress or decompress request end to end:
//!
//! ```text
//! Received ──▶ Staged ──▶ Invoked ──▶ Completed
//!     │           │           │
//!     └───────────┴───────────┴─────▶ Failed
//! ```
//!
//! Transitions are strictly forward and a failure at any stage ends the job.
//! There are no retries; the caller resubmits.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::Instrument;
use uuid::Uuid;

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::codec::{Codec, CodecMode, CodecOutcome};
use crate::error::JobError;

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Upload received (possibly absent).
    Received,
    /// Upload written to the mode's input slot.
    Staged,
    /// Codec started.
    Invoked,
    /// Codec exited 0; the output slot holds the result.
    Completed,
    /// Terminated with an error.
    Failed,
}

impl JobState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Received, Staged)
                | (Staged, Invoked)
                | (Invoked, Completed)
                | (Received | Staged | Invoked, Failed)
        )
    }
}

/// A single compress or decompress request.
#[derive(Debug, Clone)]
pub struct Job {
    id: Uuid,
    mode: CodecMode,
    state: JobState,
}

impl Job {
    /// New job in the `Received` state.
    pub fn new(mode: CodecMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            state: JobState::Received,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> CodecMode {
        self.mode
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`, rejecting anything but the forward edge.
    pub fn advance(&mut self, next: JobState) -> Result<(), JobError> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = ?self.state, to = ?next, "job transition");
        self.state = next;
        Ok(())
    }

    fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::Failed;
        }
    }
}

/// Result of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub mode: CodecMode,
    /// Slot holding the codec's output.
    pub artifact: ArtifactKind,
    /// On-disk file name of the output.
    pub filename: String,
    /// Path under which the output can be downloaded.
    pub download_link: String,
    /// Size of the staged upload.
    pub bytes_staged: u64,
}

/// Composes the artifact store and a codec into the job lifecycle.
#[derive(Clone)]
pub struct JobPipeline {
    store: ArtifactStore,
    codec: Arc<dyn Codec>,
}

impl std::fmt::Debug for JobPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPipeline")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl JobPipeline {
    pub fn new(store: ArtifactStore, codec: Arc<dyn Codec>) -> Self {
        Self { store, codec }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run one job. `upload` is `None` when the request carried no file; in
    /// that case nothing is written.
    pub async fn run<R>(&self, mode: CodecMode, upload: Option<R>) -> Result<JobReport, JobError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut job = Job::new(mode);
        let span = tracing::info_span!("job", job_id = %job.id(), mode = %mode);

        async move {
            let result = self.execute(&mut job, upload).await;
            match &result {
                Ok(report) => tracing::info!(
                    artifact = %report.artifact,
                    bytes_staged = report.bytes_staged,
                    "job completed"
                ),
                Err(err) => {
                    let reached = job.state();
                    job.fail();
                    tracing::warn!(error = %err, reached = ?reached, "job failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute<R>(&self, job: &mut Job, upload: Option<R>) -> Result<JobReport, JobError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mode = job.mode();
        let Some(mut upload) = upload else {
            return Err(JobError::NoFileUploaded);
        };

        let input = mode.input_artifact();
        let output = mode.output_artifact();

        let bytes_staged = self
            .store
            .write_upload(input.logical_name(), &mut upload)
            .await?;
        job.advance(JobState::Staged)?;

        let input_path = self.store.path_of(input);
        let output_path = self.store.path_of(output);
        job.advance(JobState::Invoked)?;

        match self.codec.run(mode, &input_path, &output_path).await? {
            CodecOutcome::Succeeded => {
                job.advance(JobState::Completed)?;
                Ok(JobReport {
                    job_id: job.id(),
                    mode,
                    artifact: output,
                    filename: output.file_name().to_string(),
                    download_link: format!("/download/{}", output.file_name()),
                    bytes_staged,
                })
            }
            CodecOutcome::Failed {
                exit_code,
                diagnostic,
            } => Err(JobError::CodecFailed {
                mode,
                exit_code,
                diagnostic,
            }),
        }
    }
}
