use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("You can't have more than {0} favorite books.")]
    CapacityExceeded(usize),

    #[error("This book is already in your favorites.")]
    AlreadyFavorited,

    #[error("Book not found in your favorites.")]
    NotFavorited,

    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the caller-facing error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::CapacityExceeded(_)
            | AppError::AlreadyFavorited
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFavorited | AppError::BookNotFound(_) | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
