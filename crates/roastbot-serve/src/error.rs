//! Error types for the RoastBot API.
//!
//! All errors render as `{ "error": string, "details"?: string }` with a
//! stable status code. Internal causes are logged, never echoed verbatim
//! unless they are meant for the caller.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::generate::GenerationError;
use crate::render::MemeError;
use crate::upload::UploadError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The body was JSON but did not match the expected shape.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A request-specific validation failure with its own message.
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("meme generation failed: {0}")]
    Meme(#[from] MemeError),

    #[error("text generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("template upload failed: {0}")]
    Upload(#[from] UploadError),

    /// Analytics store failure; the message names the failed operation.
    #[error("{message}: {source}")]
    Analytics {
        message: &'static str,
        source: roastbot_core::Error,
    },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(err) => Self::InvalidJson(err.body_text()),
            JsonRejection::MissingJsonContentType(err) => Self::InvalidJson(err.body_text()),
            other => Self::Validation(other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            Self::InvalidJson(_) => (
                StatusCode::BAD_REQUEST,
                "Invalid JSON in request body".to_string(),
                None,
            ),
            Self::Validation(details) => (
                StatusCode::BAD_REQUEST,
                "Invalid request data".to_string(),
                Some(details),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.to_string(), None),
            Self::Meme(err) => {
                tracing::error!(error = %err, "meme generation error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate meme".to_string(),
                    Some(err.to_string()),
                )
            }
            Self::Generation(err) => {
                tracing::error!(error = %err, "text generation error");
                let details = match err {
                    GenerationError::NotConfigured | GenerationError::EmptyResponse => {
                        err.to_string()
                    }
                    _ => "Failed to generate response".to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate response".to_string(),
                    Some(details),
                )
            }
            Self::Upload(err) if err.is_client_error() => {
                (StatusCode::BAD_REQUEST, err.to_string(), None)
            }
            Self::Upload(err) => {
                tracing::error!(error = %err, "template upload error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process template".to_string(),
                    None,
                )
            }
            Self::Analytics { message, source } => {
                tracing::error!(error = %source, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string(), None)
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
