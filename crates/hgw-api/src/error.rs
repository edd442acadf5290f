//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps pipeline and artifact errors from hgw-core to HTTP status codes and a
//! flat `{"error": ..., "details": ...}` JSON body. Internal faults are logged
//! but never described to the client.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hgw_core::{ArtifactError, JobError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Codec diagnostic output, present only for codec failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or incomplete request (400).
    #[error("{0}")]
    BadRequest(String),

    /// Upload exceeds the configured body limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Requested artifact is not staged (404).
    #[error("{0}")]
    NotFound(String),

    /// The codec exited non-zero (500). The diagnostic is returned to aid debugging.
    #[error("{message}")]
    CodecFailed { message: String, diagnostic: String },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::CodecFailed { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            Self::Internal(ref msg) => {
                tracing::error!(error = %msg, "internal server error");
                ErrorBody {
                    error: "An internal error occurred".to_string(),
                    details: None,
                }
            }
            Self::CodecFailed {
                message,
                diagnostic,
            } => ErrorBody {
                error: message,
                details: (!diagnostic.is_empty()).then_some(diagnostic),
            },
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                Self::PayloadTooLarge("Uploaded file is too large".to_string())
            }
            status if status.is_server_error() => Self::Internal(err.body_text()),
            _ => Self::BadRequest(err.body_text()),
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::InvalidName(name) => {
                Self::BadRequest(format!("Invalid artifact name: {name}"))
            }
            ArtifactError::NotFound(_) => Self::NotFound("File not found".to_string()),
            io @ ArtifactError::Io { .. } => Self::Internal(io.to_string()),
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NoFileUploaded => Self::BadRequest(err.to_string()),
            JobError::CodecFailed { ref diagnostic, .. } => Self::CodecFailed {
                message: err.to_string(),
                diagnostic: diagnostic.clone(),
            },
            JobError::Artifact(artifact) => artifact.into(),
            JobError::Codec(_) | JobError::InvalidTransition { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}
