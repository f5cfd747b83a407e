// ABOUTME: Error taxonomy for the photosphere studio backend
// ABOUTME: Maps each failure kind to an HTTP status and a generic client message

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Auth(String),

    /// Missing or malformed required fields
    #[error("validation failed: {0}")]
    Validation(String),

    /// Cookie ciphertext could not be decrypted (tampered or key mismatch)
    #[error("credential decrypt failed: {0}")]
    Decrypt(String),

    /// Request body could not be decoded at all
    #[error("body decode failed: {0}")]
    Decode(String),

    /// A call to the remote imagery API failed
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Full detail stays server-side; the client gets a generic message,
        // except validation errors which name the offending fields.
        let (status, message) = match &self {
            ApiError::Auth(detail) | ApiError::Decrypt(detail) => {
                warn!("unauthorized request: {}", detail);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            ApiError::Validation(detail) => {
                warn!("validation failed: {}", detail);
                (StatusCode::BAD_REQUEST, detail.clone())
            }
            ApiError::Decode(detail) => {
                warn!("undecodable request body: {}", detail);
                (StatusCode::BAD_REQUEST, "Invalid request body".to_string())
            }
            ApiError::Upstream(detail) => {
                error!("upstream failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
