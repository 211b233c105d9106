use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use onair_core::error::{CoreError, ErrorKind};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from the engine.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

/// HTTP status for an engine error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidState => StatusCode::PRECONDITION_FAILED,
        ErrorKind::Timing => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Persistence | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => {
                let status = status_for(core.kind());
                let message = match core {
                    CoreError::Persistence(msg) | CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, code = core.code(), "Engine failure");
                        "An internal error occurred".to_string()
                    }
                    CoreError::LockTimeout { .. } => {
                        tracing::warn!(error = %core, "Lock wait exhausted");
                        core.to_string()
                    }
                    other => other.to_string(),
                };
                (status, core.code(), message)
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
