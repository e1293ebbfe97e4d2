//! API error type.
//!
//! Every error maps to an HTTP status and a stable snake_case code via the
//! `IntoResponse` impl, in the `{ "error": { "code", "message" } }` shape
//! clients parse. Storage failures are logged server-side and surfaced as a
//! generic internal error.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use nocturne_types::api::{ErrorBody, ErrorDetail, codes};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Admission denied: {0}")]
    AdmissionDenied(String),

    #[error("Matching denied: {0}")]
    MatchingDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not a participant of this room")]
    NotAParticipant,

    #[error("Nightly self-end limit reached")]
    LimitReached,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AdmissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::MatchingDenied(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAParticipant => StatusCode::FORBIDDEN,
            ApiError::LimitReached => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RoomNotFound => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            ApiError::AdmissionDenied(reason) => (codes::ADMISSION_DENIED, reason.clone()),
            ApiError::MatchingDenied(reason) => (codes::MATCHING_DENIED, reason.clone()),
            ApiError::InvalidInput(reason) => (codes::INVALID_INPUT, reason.clone()),
            ApiError::NotAParticipant => (
                codes::NOT_A_PARTICIPANT,
                "token does not belong to this room".to_string(),
            ),
            ApiError::LimitReached => (
                codes::LIMIT_REACHED,
                "nightly self-end limit reached".to_string(),
            ),
            ApiError::RoomNotFound => (codes::ROOM_NOT_FOUND, "no such room".to_string()),
            ApiError::Database(err) => {
                // Log the real error server-side, return a generic message.
                error!("Database operation failed: {}", err);
                (codes::INTERNAL, "an internal error occurred".to_string())
            }
            ApiError::Internal => (codes::INTERNAL, "an internal error occurred".to_string()),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

/// Shared mapping for `spawn_blocking` join failures.
pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", e);
    ApiError::Internal
}
