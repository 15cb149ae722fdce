use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use roastd_core::RoastError;
use roastd_storage::StorageError;

/// Application-level error type for HTTP handlers.
///
/// Produces `{ "error": message, "code": CODE }` bodies. Internal details
/// are logged and replaced by a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Roast(#[from] RoastError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Roast(err) => match err {
                RoastError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
                RoastError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                RoastError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                RoastError::UpstreamUnavailable(msg) => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE", msg.clone())
                }
                RoastError::Internal(e) => {
                    error!("Internal error: {:#}", e);
                    internal()
                }
            },
            AppError::Storage(err) => match err {
                StorageError::InvalidName(name) => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", format!("invalid object name '{}'", name))
                }
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                other => {
                    error!("Storage error: {}", other);
                    internal()
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                self.to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
