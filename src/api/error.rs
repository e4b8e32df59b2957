use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::types::ErrorBody;
use crate::catalog::CatalogError;

/// An error response: status code plus the message shown to the caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        // Dependency failures are logged where they happen; callers get a
        // generic message.
        let (status, message) = match err {
            CatalogError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            e @ CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            CatalogError::StoreUnavailable(_) | CatalogError::CorruptDocument(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            CatalogError::UpstreamError(_) | CatalogError::UpstreamTimeout(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Summary service unavailable".to_string(),
            ),
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
