use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::services::tasks::ResultError;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Task {0} not found")]
    NotFound(String),

    #[error("Task {0} is still processing")]
    NotReady(String),

    #[error("No data available for download: {0}")]
    TaskFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotReady(_) => StatusCode::CONFLICT,
            ApiError::TaskFailed(_) | ApiError::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::NotReady(_) => "not_ready",
            ApiError::TaskFailed(_) => "task_failed",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<ResultError> for ApiError {
    fn from(err: ResultError) -> Self {
        match err {
            ResultError::NotFound(id) => ApiError::NotFound(id),
            ResultError::NotReady(id) => ApiError::NotReady(id),
            ResultError::Failed { detail, .. } => ApiError::TaskFailed(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref detail) = self {
            tracing::error!(error = %detail, "Request failed");
        }
        let body = json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_errors_map_to_status() {
        let cases = [
            (ResultError::NotFound("t".into()), StatusCode::NOT_FOUND),
            (ResultError::NotReady("t".into()), StatusCode::CONFLICT),
            (
                ResultError::Failed {
                    task_id: "t".into(),
                    detail: "timeout: slow".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(ApiError::NotReady("t".into()).error_code(), "not_ready");
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
