use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::db::DatabaseError;

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Entry {0} not found")]
    NotFound(i64),

    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(id) => json_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Entry {} not found", id),
            ),
            ApiError::Store(ref e) if e.is_busy() => {
                tracing::warn!("Store busy: {}", e);
                json_error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "busy",
                    "store is busy, try again",
                )
            }
            other => {
                // Operational faults are logged but not described to the client.
                tracing::error!("Request failed: {}", other);
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                )
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
