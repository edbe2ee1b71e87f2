use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chirp_types::ErrorResponse;

use crate::engine::EngagementError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", Some(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", Some(msg)),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    Some("An unexpected error occurred".to_string()),
                )
            }
        };

        let error_response = ErrorResponse {
            error: message.to_string(),
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<EngagementError> for ApiError {
    fn from(err: EngagementError) -> Self {
        match err {
            EngagementError::NotFound(_) => ApiError::NotFound(err.to_string()),
            EngagementError::InsufficientPoints { .. }
            | EngagementError::AlreadyTransferredToday
            | EngagementError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            EngagementError::Store(inner) => ApiError::InternalError(format!("{:#}", inner)),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{:#}", err))
    }
}
