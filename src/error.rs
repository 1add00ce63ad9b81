// Error taxonomy: sample, store, request and HTTP-facing errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A GPU query that produced no usable reading. Recovered by dropping the sample.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("GPU query failed: {0}")]
    Query(String),

    #[error("GPU query timed out after {0} ms")]
    Timeout(u64),

    #[error("unparsable GPU utilization output: {0:?}")]
    Parse(String),

    #[error("GPU utilization out of range: {0}")]
    OutOfRange(f64),
}

/// Persistent store failure. Writes are retried on the next fold; reads surface as 5xx.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    Write(#[source] sqlx::Error),

    #[error("store read failed: {0}")]
    Read(#[source] sqlx::Error),

    #[error("store operation {operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("corrupt row for {date}: {reason}")]
    Corrupt { date: String, reason: String },
}

/// Invalid graph query parameters. Never silently corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid theme {0:?}: expected one of light, dark")]
    InvalidTheme(String),

    #[error("invalid weeks {value:?}: expected an integer between 1 and {max}")]
    InvalidWeeks { value: String, max: u32 },
}

/// Errors returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] RequestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("render failed: {0}")]
    Render(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
