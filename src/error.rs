use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to load route: {0}")]
    LoadFailure(String),

    #[error("Route optimizer call failed: {0}")]
    OptimizerCall(String),

    #[error("Malformed optimizer response: {0}")]
    MalformedOptimizerResponse(String),

    #[error("Failed to save change: {0}")]
    MutationWrite(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures of the enhanced path. The route stays in its
    /// pre-optimization order when one of these is returned.
    pub fn is_optimizer_failure(&self) -> bool {
        matches!(
            self,
            AppError::OptimizerCall(_) | AppError::MalformedOptimizerResponse(_)
        )
    }
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal database error")
            }
            AppError::LoadFailure(ref e) => {
                tracing::error!("Route load failed: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Failed to fetch appointments")
            }
            AppError::OptimizerCall(ref e) => {
                tracing::error!("Optimizer call failed: {}", e);
                (StatusCode::BAD_GATEWAY, "Failed to optimize route")
            }
            AppError::MalformedOptimizerResponse(ref e) => {
                tracing::warn!("Malformed optimizer response: {}", e);
                (StatusCode::BAD_GATEWAY, "Failed to optimize route")
            }
            AppError::MutationWrite(ref e) => {
                tracing::error!("Mutation write failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save change")
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::NotFound(ref e) => (StatusCode::NOT_FOUND, e.as_str()),
            AppError::Forbidden(ref e) => {
                tracing::warn!("Forbidden: {}", e);
                (StatusCode::FORBIDDEN, e.as_str())
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
