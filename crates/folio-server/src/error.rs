//! Application error types and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::FolioError;
use serde::Serialize;
use tracing::error;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level errors with HTTP status code mapping.
///
/// Only `BadRequest` and `Unauthorized` messages reach the client; anything
/// internal is logged and replaced with a generic message.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl AppError {
    /// Creates an Internal error from any error type.
    pub fn internal(e: impl std::fmt::Display) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<FolioError> for AppError {
    fn from(e: FolioError) -> Self {
        match e {
            FolioError::InvalidInput(msg) => AppError::BadRequest(msg),
            FolioError::Unauthorized(msg) => AppError::Unauthorized(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => {
                error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
