//! Boundary error type: every handler returns `Result<T, AppError>`.
//!
//! Server-class failures are captured to Sentry and answered with a generic
//! message; client-class failures carry their message through to the JSON
//! body as `{"error": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AuthError, DownloadError};
use crate::storage::StorageError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    #[error("download: {0}")]
    Download(#[from] DownloadError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal: {0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl AppError {
    /// Status code and client-facing message. Anything 5xx gets the generic
    /// message; the real cause stays in logs and Sentry.
    fn classify(&self) -> (StatusCode, String) {
        match self {
            Self::Store(_) | Self::Storage(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into())
            }
            Self::Auth(err) => Self::classify_auth(err),
            Self::Download(err) => Self::classify_download(err),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }

    fn classify_auth(err: &AuthError) -> (StatusCode, String) {
        match err {
            // Unknown user and wrong password answer identically.
            AuthError::InvalidCredentials | AuthError::UserNotFound => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".into())
            }
            AuthError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "This username is already taken".into())
            }
            AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::InvalidEmail(_) => {
                (StatusCode::BAD_REQUEST, "Invalid email address".into())
            }
            AuthError::Token(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token".into()),
            AuthError::Store(_) | AuthError::PasswordHash => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into())
            }
        }
    }

    fn classify_download(err: &DownloadError) -> (StatusCode, String) {
        match err {
            DownloadError::NotFound => (StatusCode::NOT_FOUND, "Document not found".into()),
            DownloadError::MissingFile => (StatusCode::NOT_FOUND, "Document has no file".into()),
            DownloadError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Login required to download this document".into(),
            ),
            DownloadError::Store(_) | DownloadError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
