use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::inference::InferenceError;

/// Error type for the JSON API handlers.
///
/// Renders as `{ "success": false, "error": "..." }`. Internal failures are
/// logged in full and reported to the caller with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Inference(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Inference(err) => err.to_string(),
            AppError::Database(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Inference(err) => tracing::error!(error = %err, "Image generation failed"),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error")
            }
            AppError::Validation(_) | AppError::NotFound(_) => {}
        }
        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
