use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::retry::Retryable;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How a store failure is classified at the point where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// Store access was refused. Fatal.
    PermissionDenied,
    /// Malformed filter, predicate, projection or page request. Fatal.
    InvalidArguments,
    /// Anything else; assumed to go away when retried.
    Transient,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErrorKind::PermissionDenied => write!(f, "permission denied"),
            LoadErrorKind::InvalidArguments => write!(f, "invalid arguments"),
            LoadErrorKind::Transient => write!(f, "transient failure"),
        }
    }
}

/// A classified failure raised by the store gateway, the paging engine or the
/// album aggregator.
#[derive(Error, Debug)]
#[error("{kind}: {cause}")]
pub struct LoadError {
    kind: LoadErrorKind,
    #[source]
    cause: BoxError,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, cause: impl Into<BoxError>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }

    pub fn permission_denied(cause: impl Into<BoxError>) -> Self {
        Self::new(LoadErrorKind::PermissionDenied, cause)
    }

    pub fn invalid_arguments(cause: impl Into<BoxError>) -> Self {
        Self::new(LoadErrorKind::InvalidArguments, cause)
    }

    pub fn transient(cause: impl Into<BoxError>) -> Self {
        Self::new(LoadErrorKind::Transient, cause)
    }

    pub fn kind(&self) -> LoadErrorKind {
        self.kind
    }

    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

impl Retryable for LoadError {
    fn is_retryable(&self) -> bool {
        self.kind == LoadErrorKind::Transient
    }
}

impl From<r2d2::Error> for LoadError {
    fn from(e: r2d2::Error) -> Self {
        LoadError::transient(e)
    }
}

impl From<tokio::task::JoinError> for LoadError {
    fn from(e: tokio::task::JoinError) -> Self {
        LoadError::transient(e)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Permission denied: {0}")]
    PermissionDenied(#[source] LoadError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[source] LoadError),

    #[error("Unknown error: {0}")]
    Unknown(#[source] LoadError),

    #[error("Failed to load albums: {0}")]
    AlbumLoadFailed(#[source] LoadError),

    #[error("No albums found")]
    NoAlbumsFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

}

impl AppError {
    /// Lifts an engine failure into the media use-case taxonomy.
    pub fn from_media_failure(error: LoadError) -> Self {
        match error.kind() {
            LoadErrorKind::PermissionDenied => AppError::PermissionDenied(error),
            LoadErrorKind::InvalidArguments => AppError::InvalidArguments(error),
            LoadErrorKind::Transient => AppError::Unknown(error),
        }
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unknown(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::PermissionDenied(e) => {
                tracing::warn!("Store access refused: {}", e);
                (StatusCode::FORBIDDEN, "Permission denied".to_string())
            }
            AppError::InvalidArguments(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Unknown(e) => {
                tracing::error!("Media load failed: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Media store unavailable".to_string(),
                )
            }
            AppError::AlbumLoadFailed(e) => {
                tracing::error!("Album load failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load albums".to_string(),
                )
            }
            AppError::NoAlbumsFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Connection pool error".to_string(),
                )
            }
        };

        let body = Json(json!({ "detail": message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
