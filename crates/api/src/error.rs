//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Saga execution error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::Order(OrderError::NotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),
        SagaError::Order(OrderError::InvalidTransition { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        SagaError::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        SagaError::Transient { .. } | SagaError::Timeout { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        SagaError::CompensationFailure { .. } | SagaError::Bus(_) => {
            tracing::error!(error = %err, "saga failed irrecoverably");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
