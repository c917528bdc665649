use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{auth::oauth::OAuthError, media::MediaError, store::StoreError};

#[derive(Debug)]
pub enum AppError {
    ValidationFailure(String),
    InvalidCredential,
    InvalidToken,
    MissingToken,
    NotFound(String),
    AlreadyExists(String),
    UpstreamFailure,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationFailure(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidCredential => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::MissingToken => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::AlreadyExists(msg) => (StatusCode::CONFLICT, msg),
            AppError::UpstreamFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "message": error_message,
            "data": null
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(entity) => AppError::NotFound(format!("{entity} not found")),
            StoreError::Conflict(msg) => AppError::AlreadyExists(msg),
            StoreError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                AppError::UpstreamFailure
            }
            StoreError::Poisoned => {
                tracing::error!("In-memory store lock poisoned");
                AppError::UpstreamFailure
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        tracing::error!("Media upload error: {:?}", e);
        AppError::UpstreamFailure
    }
}

impl From<OAuthError> for AppError {
    fn from(e: OAuthError) -> Self {
        tracing::debug!("OAuth verification failed: {}", e);
        AppError::InvalidToken
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationFailure(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationFailure(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationFailure(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::ValidationFailure(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::ValidationFailure(e.to_string())
    }
}
