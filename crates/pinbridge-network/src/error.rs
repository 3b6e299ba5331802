//! Request errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pinbridge_hardware::DispatchError;

/// Errors reported to front-end clients.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The request body is not a valid command request.
    #[error("Malformed request: {0}")]
    Parse(String),

    /// The request was valid but dispatching it failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The task running the batch panicked or was aborted.
    #[error("Dispatch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RequestError {
    /// HTTP status the error is reported with.
    ///
    /// | Error | Status |
    /// |-------|--------|
    /// | `Parse` | 400 Bad Request |
    /// | `DestinationNotFound` | 404 Not Found |
    /// | `Connection` | 503 Service Unavailable |
    /// | `Input` | 422 Unprocessable Entity |
    /// | `Task` | 500 Internal Server Error |
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(DispatchError::DestinationNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Dispatch(DispatchError::Connection { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Dispatch(DispatchError::Input { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}
