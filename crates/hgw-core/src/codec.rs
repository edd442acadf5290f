//! # Codec Invoker
//!
//! The Huffman codec is an external executable with a fixed command line:
//!
//! ```text
//! <executable> <c|d> <input-path> <output-path>
//! ```
//!
//! Exit status 0 is success; anything else is a failure whose error stream
//! is kept (bounded) as a diagnostic. The output file is never inspected.
//!
//! [`Codec`] is the seam: the gateway runs [`ProcessCodec`], tests plug in
//! in-process fakes.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::artifact::ArtifactKind;
use crate::error::CodecError;

/// Maximum number of error-stream bytes retained from a codec run.
pub const DIAGNOSTIC_LIMIT: usize = 4 * 1024;

/// Direction of a codec run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecMode {
    /// Encode: flag `c`.
    Compress,
    /// Decode: flag `d`.
    Decompress,
}

impl CodecMode {
    /// Command-line flag passed to the executable.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Compress => "c",
            Self::Decompress => "d",
        }
    }

    /// Lowercase name used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compress => "compress",
            Self::Decompress => "decompress",
        }
    }

    /// Noun used in user-facing messages ("Compression successful!").
    pub fn verb(self) -> &'static str {
        match self {
            Self::Compress => "Compression",
            Self::Decompress => "Decompression",
        }
    }

    /// Slot the upload is staged into.
    pub fn input_artifact(self) -> ArtifactKind {
        match self {
            Self::Compress => ArtifactKind::Input,
            Self::Decompress => ArtifactKind::Compressed,
        }
    }

    /// Slot the codec writes its result to.
    pub fn output_artifact(self) -> ArtifactKind {
        match self {
            Self::Compress => ArtifactKind::Compressed,
            Self::Decompress => ArtifactKind::Output,
        }
    }
}

impl std::fmt::Display for CodecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a codec run that got as far as exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecOutcome {
    /// Exit status 0.
    Succeeded,
    /// Non-zero exit or termination by signal.
    Failed {
        /// Exit code; `None` when killed by a signal.
        exit_code: Option<i32>,
        /// Error stream, truncated to [`DIAGNOSTIC_LIMIT`] bytes.
        diagnostic: String,
    },
}

impl CodecOutcome {
    /// Classify a finished process.
    pub fn from_status(status: ExitStatus, diagnostic: String) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed {
                exit_code: status.code(),
                diagnostic,
            }
        }
    }

    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Dual-mode transform from an input file to an output file.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Transform `input` into `output` in the given mode.
    ///
    /// `Ok` covers every run that exited, successfully or not; `Err` is
    /// reserved for failing to run at all.
    async fn run(
        &self,
        mode: CodecMode,
        input: &Path,
        output: &Path,
    ) -> Result<CodecOutcome, CodecError>;
}

/// One external process run: `[executable, flag, input, output]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInvocation {
    executable: PathBuf,
    mode: CodecMode,
    input: PathBuf,
    output: PathBuf,
}

impl CodecInvocation {
    /// Describe a run of `executable`.
    pub fn new(executable: &Path, mode: CodecMode, input: &Path, output: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
            mode,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }
    }

    /// Full argument vector, executable first.
    pub fn argv(&self) -> [&OsStr; 4] {
        [
            self.executable.as_os_str(),
            OsStr::new(self.mode.flag()),
            self.input.as_os_str(),
            self.output.as_os_str(),
        ]
    }

    fn command(&self) -> Command {
        let [program, args @ ..] = self.argv();
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

/// Runs a resolved codec executable as a child process.
///
/// The executable path must already be validated; see the gateway's startup
/// configuration. The child is not killed if the awaiting future is dropped.
#[derive(Debug, Clone)]
pub struct ProcessCodec {
    executable: PathBuf,
}

impl ProcessCodec {
    /// Wrap a resolved executable path.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Path of the executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl Codec for ProcessCodec {
    async fn run(
        &self,
        mode: CodecMode,
        input: &Path,
        output: &Path,
    ) -> Result<CodecOutcome, CodecError> {
        let invocation = CodecInvocation::new(&self.executable, mode, input, output);
        tracing::debug!(argv = ?invocation.argv(), "spawning codec");

        let mut child = invocation
            .command()
            .spawn()
            .map_err(|source| CodecError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        let diagnostic = match child.stderr.take() {
            Some(stderr) => read_diagnostic(stderr).await.map_err(CodecError::Wait)?,
            None => String::new(),
        };
        let status = child.wait().await.map_err(CodecError::Wait)?;

        let outcome = CodecOutcome::from_status(status, diagnostic);
        tracing::debug!(%status, success = outcome.is_success(), "codec exited");
        Ok(outcome)
    }
}

/// Keep the first [`DIAGNOSTIC_LIMIT`] bytes of `stream` and drain the rest,
/// so the child never stalls on a full pipe.
async fn read_diagnostic<R>(mut stream: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    (&mut stream)
        .take(DIAGNOSTIC_LIMIT as u64)
        .read_to_end(&mut captured)
        .await?;
    tokio::io::copy(&mut stream, &mut tokio::io::sink()).await?;
    Ok(String::from_utf8_lossy(&captured).trim_end().to_string())
}
