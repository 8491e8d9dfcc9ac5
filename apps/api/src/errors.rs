use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::pipeline::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::EmptyResult { .. } => AppError::UnprocessableEntity(e.to_string()),
            AnalysisError::Input { .. } => AppError::Validation(e.to_string()),
            AnalysisError::CapabilityUnavailable(_) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Timeout(secs) => {
                tracing::warn!("Analysis exceeded the {secs}s request budget");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    format!("Analysis did not finish within {secs} seconds"),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_maps_to_422() {
        let err: AppError = AnalysisError::EmptyResult { documents: 2 }.into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("persona is required".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Timeout(60).into_response().status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
