//! # Configuration
//!
//! Environment-driven settings and codec discovery.
//!
//! | Variable               | Default                         |
//! |------------------------|---------------------------------|
//! | `PORT`                 | `5000`                          |
//! | `HGW_STAGING_DIR`      | `uploads`                       |
//! | `HGW_CODEC_PATH`       | platform default, see [`default_codec_path`] |
//! | `HGW_MAX_UPLOAD_BYTES` | 16 MiB                          |
//! | `HGW_CORS`             | off; `permissive` allows any origin |
//! | `HGW_LOG_FORMAT`       | `text`; `json` for structured output |

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default staging directory, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = "uploads";

/// Default request body limit for uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// The codec executable does not exist.
    #[error("codec executable not found at {}", path.display())]
    CodecMissing { path: PathBuf },

    /// The codec path exists but cannot be executed.
    #[error("codec at {} is not executable", path.display())]
    CodecNotExecutable { path: PathBuf },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding job artifacts.
    pub staging_dir: PathBuf,
    /// Explicit codec location. `None` selects the platform default.
    pub codec_path: Option<PathBuf>,
    /// Maximum accepted request body size.
    pub max_upload_bytes: usize,
    /// Allow cross-origin requests from any origin.
    pub cors_permissive: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            codec_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_permissive: false,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(dir) = lookup("HGW_STAGING_DIR").filter(|v| !v.trim().is_empty()) {
            config.staging_dir = PathBuf::from(dir);
        }
        config.codec_path = lookup("HGW_CODEC_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        if let Some(limit) = lookup("HGW_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("HGW_MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(cors) = lookup("HGW_CORS") {
            config.cors_permissive = match cors.to_lowercase().as_str() {
                "permissive" => true,
                "off" | "" => false,
                _ => return Err(invalid("HGW_CORS", &cors, "expected `permissive` or `off`")),
            };
        }
        if let Some(format) = lookup("HGW_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                _ => return Err(invalid("HGW_LOG_FORMAT", &format, "expected `text` or `json`")),
            };
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(var, value, &e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Where the codec lives when `HGW_CODEC_PATH` is unset.
///
/// Windows builds look for the bundled `Huffman_C\huffman.exe`; everywhere
/// else the container build output at `/app/build/bin/main`.
pub fn default_codec_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"Huffman_C\huffman.exe")
    } else {
        PathBuf::from("/app/build/bin/main")
    }
}

/// Resolve and validate the codec executable.
///
/// Returns an absolute path to an existing, executable regular file.
pub fn locate_codec(configured: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let candidate = configured
        .map(Path::to_path_buf)
        .unwrap_or_else(default_codec_path);
    let path = if candidate.is_absolute() {
        candidate
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&candidate))
            .unwrap_or(candidate)
    };

    let metadata = std::fs::metadata(&path).ok();
    ensure_runnable(&path, metadata.as_ref())?;
    Ok(path)
}

/// Check that `metadata` describes a regular file the process may execute.
///
/// Shared by startup and the readiness probe. `None` means the path could not
/// be stat'ed.
pub fn ensure_runnable(path: &Path, metadata: Option<&Metadata>) -> Result<(), ConfigError> {
    let metadata = match metadata {
        Some(m) if m.is_file() => m,
        _ => {
            return Err(ConfigError::CodecMissing {
                path: path.to_path_buf(),
            })
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConfigError::CodecNotExecutable {
                path: path.to_path_buf(),
            });
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}
