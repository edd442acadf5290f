//! # Artifact Store
//!
//! Owns the staging directory that holds job inputs and outputs. Every path
//! handed to the codec or served for download is produced here.
//!
//! ## Naming
//!
//! Artifacts have logical names (`input`, `compressed`, `output`) that map to
//! fixed on-disk file names. Names arriving from requests are restricted to a
//! single plain path component, so resolution can never leave the staging
//! directory.
//!
//! ## Sharing
//!
//! Slots are shared across requests. A new job of the same kind overwrites
//! the previous artifact; concurrent jobs of the same kind race.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::ArtifactError;

/// Fixed artifact slots in the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Raw upload awaiting compression.
    Input,
    /// Codec-compressed payload. Output of compress, input of decompress.
    Compressed,
    /// Decompressed payload.
    Output,
}

impl ArtifactKind {
    /// All slots.
    pub const ALL: [ArtifactKind; 3] = [Self::Input, Self::Compressed, Self::Output];

    /// Logical name used by the pipeline and accepted by download requests.
    pub fn logical_name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Compressed => "compressed",
            Self::Output => "output",
        }
    }

    /// File name inside the staging directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Input => "input.txt",
            Self::Compressed => "compressed.bin",
            Self::Output => "output.txt",
        }
    }

    /// Look up a slot by its logical name.
    pub fn from_logical_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.logical_name() == name)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// An artifact opened for download.
#[derive(Debug)]
pub struct StagedArtifact {
    /// Open handle positioned at the start of the file.
    pub file: File,
    /// On-disk file name, suitable for `Content-Disposition`.
    pub file_name: String,
    /// Size in bytes at open time.
    pub len: u64,
}

/// Filesystem-backed store rooted at the staging directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`.
    ///
    /// Relative roots are anchored at the current working directory so every
    /// resolved path is absolute. The directory itself is created lazily on
    /// the first upload.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            let cwd = std::env::current_dir().map_err(|e| ArtifactError::io(&root, e))?;
            cwd.join(root)
        };
        Ok(Self { root })
    }

    /// Create the staging directory if needed and root a store at its
    /// canonical path.
    ///
    /// Used at startup so `..` segments and symlinks in the configured path
    /// never reach the codec's argument list.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| ArtifactError::io(&root, e))?;
        let root = fs::canonicalize(&root)
            .await
            .map_err(|e| ArtifactError::io(&root, e))?;
        tracing::debug!(root = %root.display(), "staging directory opened");
        Ok(Self { root })
    }

    /// Absolute path of the staging directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a fixed slot.
    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Resolve a request-supplied name to an absolute path in the staging
    /// directory.
    ///
    /// Logical names map to their slot's file name; any other name must be a
    /// single normal path component and resolves to itself.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        if let Some(kind) = ArtifactKind::from_logical_name(name) {
            return Ok(self.path_of(kind));
        }
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Persist `reader` under `name`, replacing any existing artifact.
    ///
    /// Returns the number of bytes written.
    pub async fn write_upload<R>(&self, name: &str, reader: &mut R) -> Result<u64, ArtifactError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.resolve(name)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ArtifactError::io(&self.root, e))?;

        let mut file = File::create(&path)
            .await
            .map_err(|e| ArtifactError::io(&path, e))?;
        let written = tokio::io::copy(reader, &mut file)
            .await
            .map_err(|e| ArtifactError::io(&path, e))?;
        file.flush().await.map_err(|e| ArtifactError::io(&path, e))?;

        tracing::debug!(artifact = name, path = %path.display(), bytes = written, "artifact staged");
        Ok(written)
    }

    /// Whether a regular file is staged under `name`. Invalid names never exist.
    pub async fn exists(&self, name: &str) -> bool {
        let Ok(path) = self.resolve(name) else {
            return false;
        };
        fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Open a staged artifact for reading.
    pub async fn open_for_download(&self, name: &str) -> Result<StagedArtifact, ArtifactError> {
        let path = self.resolve(name)?;

        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(ArtifactError::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(name.to_string()))
            }
            Err(e) => return Err(ArtifactError::io(&path, e)),
        };

        let file = File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArtifactError::NotFound(name.to_string()),
            _ => ArtifactError::io(&path, e),
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());

        Ok(StagedArtifact {
            file,
            file_name,
            len: metadata.len(),
        })
    }

    /// Whether the staging directory can accept uploads: either it is a
    /// directory or it does not exist yet.
    pub async fn is_usable(&self) -> bool {
        match fs::metadata(&self.root).await {
            Ok(m) => m.is_dir(),
            Err(e) => e.kind() == std::io::ErrorKind::NotFound,
        }
    }
}

/// Accept only names that are exactly one normal path component.
fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let invalid = || ArtifactError::InvalidName(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', ':', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
