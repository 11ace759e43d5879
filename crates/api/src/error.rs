use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pdfrelay_core::error::CoreError;
use pdfrelay_worker::JobError;

/// Application-level error type for HTTP handlers.
///
/// Every variant renders as a plain-text body. Client-caused errors carry
/// their message; engine and server failures are logged in full and
/// answered with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `pdfrelay_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The multipart body could not be read (malformed or over the limit).
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// The conversion job failed.
    #[error(transparent)]
    Job(#[from] JobError),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Body sent for server-side failures.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                CoreError::UnsupportedOption(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            },

            // --- Upload errors ---
            AppError::Multipart(err) => {
                tracing::debug!(error = %err, "Rejected multipart body");
                (err.status(), err.body_text())
            }

            // --- Conversion errors (details already logged by the runner) ---
            AppError::Job(JobError::TimedOut { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, "Conversion timed out".to_string())
            }
            AppError::Job(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Conversion failed".to_string())
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        (status, message).into_response()
    }
}
