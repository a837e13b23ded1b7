//! # Relay Errors
//!
//! Every failure a comparison can hit, and how it is reported to the caller.
//! Input problems are the caller's fault (400); anything that goes wrong
//! after the images are normalized is ours (500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use super::messages::ErrorBody;

pub const PROCESSING_FAILED: &str = "Error decoding or processing images";
pub const VERIFICATION_FAILED: &str = "Face verification failed";
pub const VERIFICATION_UNREACHABLE: &str = "Face verification service unreachable";
pub const UNEXPECTED_RESPONSE: &str = "Unexpected verification response structure";
pub const INTERNAL_FAILURE: &str = "Internal error while preparing the verification request";

#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or empty fields, or a body that is not JSON.
    #[error("{message}")]
    InvalidInput {
        message: String,
        details: Option<String>,
    },

    #[error("base64 decoding failed: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The external tool failed, could not be started, or timed out.
    #[error("image normalization failed: {0}")]
    Normalization(String),

    /// Non-200 from the verification service; `body` is kept verbatim.
    #[error("verification service returned HTTP {status}")]
    Upstream { status: u16, body: String },

    #[error("verification service unreachable: {0}")]
    UpstreamUnavailable(String),

    #[error("unexpected verification response: {0}")]
    MalformedUpstreamResponse(String),

    /// Local fault after normalization succeeded, e.g. reading an image back.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } | Self::Decode(_) | Self::Normalization(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Upstream { .. }
            | Self::UpstreamUnavailable(_)
            | Self::MalformedUpstreamResponse(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, stable summary placed in the `error` field.
    pub fn summary(&self) -> String {
        match self {
            Self::InvalidInput { message, .. } => message.clone(),
            Self::Decode(_) | Self::Normalization(_) => PROCESSING_FAILED.to_string(),
            Self::Upstream { .. } => VERIFICATION_FAILED.to_string(),
            Self::UpstreamUnavailable(_) => VERIFICATION_UNREACHABLE.to_string(),
            Self::MalformedUpstreamResponse(_) => UNEXPECTED_RESPONSE.to_string(),
            Self::Internal(_) => INTERNAL_FAILURE.to_string(),
        }
    }

    /// Diagnostic text placed in the `details` field.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidInput { details, .. } => details.clone(),
            Self::Upstream { body, .. } => Some(body.clone()),
            Self::MalformedUpstreamResponse(raw) => Some(raw.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.summary(),
            details: self.details(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
