use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;
use tracing::error;

use spark_core::CoreError;

/// Wraps `CoreError` into an HTTP response: one status per failure kind and
/// a JSON `{message}` body.
pub struct ApiError(pub CoreError);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::AlreadyLiked => StatusCode::CONFLICT,
            CoreError::NotFound => StatusCode::NOT_FOUND,
            CoreError::Crypto(e) => {
                error!("crypto failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CoreError::Gateway(e) => {
                error!("persistence failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", e);
        Self(CoreError::Gateway(anyhow::anyhow!("blocking task failed")))
    }
}
