//! HTTP-facing error mapping for mediastem-api
//!
//! Every failure maps to a stable status with a machine-readable
//! `{"error": {"code", "message"}}` body. Rate-limit denials carry
//! `remaining` and `reset_at` alongside so clients can back off.
//! Raw provider errors are logged, never leaked.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediastem_common::Error;
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::error;

/// API error type
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// Service error with a defined status mapping
    #[error(transparent)]
    Core(#[from] Error),

    /// Anything else (500)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Core(err) => core_response(err),
            ApiError::Other(err) => {
                error!(error = %err, "unhandled internal error");
                let body = Json(json!({
                    "error": {
                        "code": "INTERNAL_ERROR",
                        "message": "internal server error",
                    }
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

fn core_response(err: Error) -> Response {
    let (status, code) = match &err {
        Error::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        Error::AllProvidersFailed(_) => (StatusCode::BAD_REQUEST, "ALL_PROVIDERS_FAILED"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    let body = match &err {
        Error::RateLimited {
            remaining,
            total,
            reset_at,
        } => Json(json!({
            "error": {
                "code": code,
                "message": err.to_string(),
            },
            "remaining": remaining,
            "total": total,
            "reset_at": reset_at,
        })),
        _ => Json(json!({
            "error": {
                "code": code,
                "message": err.to_string(),
            }
        })),
    };

    (status, body).into_response()
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn status_mapping_is_stable() {
        let cases = [
            (
                Error::RateLimited {
                    remaining: 0,
                    total: 10,
                    reset_at: Utc::now(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                Error::AllProvidersFailed("x; y".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (Error::NotFound("id".to_string()), StatusCode::NOT_FOUND),
            (
                Error::InvalidInput("bad url".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Internal("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError::Core(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
