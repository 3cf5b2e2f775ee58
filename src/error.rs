use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

pub const MISSING_FIELDS: &str = "Title and file are required";
pub const INVALID_FILE_TYPE: &str = "Invalid file type";

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed client input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    /// Writing an uploaded file to the upload directory failed.
    #[error("failed to write upload: {0}")]
    StorageWrite(#[source] std::io::Error),

    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("failed to render page: {0}")]
    Render(#[from] tera::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn missing_fields() -> Self {
        AppError::Validation(MISSING_FIELDS.to_string())
    }

    pub fn invalid_file_type() -> Self {
        AppError::Validation(INVALID_FILE_TYPE.to_string())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageWrite(_)
            | AppError::Io(_)
            | AppError::Storage(_)
            | AppError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
            return (status, "Internal server error").into_response();
        }
        if status != StatusCode::NOT_FOUND {
            warn!("Rejected request: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
