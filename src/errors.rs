use crate::services::archive::ArchiveError;
use crate::services::buckets::BucketStoreError;
use crate::services::store::StoreError;
use crate::services::users::UserStoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::Validation(_) => AppError::bad_request(message),
            StoreError::Auth(_) => AppError::unauthorized(message),
            StoreError::NotFound(_) => AppError::not_found(message),
            StoreError::RegionMismatch(_) => AppError::bad_request(message),
            StoreError::Network(_) => AppError::new(StatusCode::BAD_GATEWAY, message),
            StoreError::Unknown(_) => AppError::internal(message),
        }
    }
}

impl From<BucketStoreError> for AppError {
    fn from(err: BucketStoreError) -> Self {
        match &err {
            BucketStoreError::NotFound(_) => AppError::not_found(err.to_string()),
            BucketStoreError::Sqlx(_) => AppError::internal(err.to_string()),
            _ => AppError::bad_request(err.to_string()),
        }
    }
}

impl From<UserStoreError> for AppError {
    fn from(err: UserStoreError) -> Self {
        match &err {
            UserStoreError::InvalidCredentials | UserStoreError::InvalidSession => {
                AppError::unauthorized(err.to_string())
            }
            UserStoreError::UserNotFound(_) => AppError::not_found(err.to_string()),
            UserStoreError::UsernameTaken(_)
            | UserStoreError::EmptyUsername
            | UserStoreError::WeakPassword => AppError::bad_request(err.to_string()),
            UserStoreError::Hash(_) | UserStoreError::Sqlx(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match &err {
            ArchiveError::EmptySelection => AppError::bad_request(err.to_string()),
            ArchiveError::FolderResolve { source, .. }
            | ArchiveError::ObjectFetch { source, .. } => {
                let status = AppError::from(source.clone()).status;
                AppError::new(status, err.to_string())
            }
            ArchiveError::Zip(_) | ArchiveError::Io(_) => AppError::internal(err.to_string()),
        }
    }
}
