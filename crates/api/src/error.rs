use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tradeportal_core::{DirectoryError, LedgerError};
use tradeportal_platform::PlatformError;

/// Errors returned by route handlers, rendered as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or invalid admin token")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    /// Vendor rejected the call; the message is passed through verbatim.
    #[error("{0}")]
    Vendor(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("{0}")]
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(_) => ApiError::NotFound(e.to_string()),
            LedgerError::Transition(_) | LedgerError::InProgress(_) => {
                ApiError::Conflict(e.to_string())
            }
            LedgerError::DatabaseError(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match directory_status(&e) {
            StatusCode::NOT_FOUND => ApiError::NotFound(e.to_string()),
            StatusCode::CONFLICT => ApiError::Conflict(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

fn directory_status(e: &DirectoryError) -> StatusCode {
    match e {
        DirectoryError::UnknownUser(_) => StatusCode::NOT_FOUND,
        DirectoryError::AlreadyAssigned(_) | DirectoryError::AccountTaken { .. } => {
            StatusCode::CONFLICT
        }
        DirectoryError::DatabaseError(_) | DirectoryError::Unavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Vendor(_) => StatusCode::BAD_GATEWAY,
            ApiError::Platform(PlatformError::Authentication(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Platform(PlatformError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Platform(PlatformError::Directory(e)) => directory_status(e),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}
