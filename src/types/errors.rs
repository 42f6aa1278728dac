//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use axum::http::StatusCode;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the Wolfram server.
#[derive(Error, Debug)]
pub enum Error {
    /// Session creation/recreation exhausted all retries (maps to HTTP 503).
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    /// Caller-specified timeout elapsed before the kernel responded.
    /// The underlying kernel call is abandoned, not guaranteed terminated.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The kernel executed but reported its failure sentinel
    /// (`$Failed`/`$Aborted`) instead of a value.
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The kernel binding itself raised (process died, protocol error).
    /// The session is marked dead and recreated on next use.
    #[error("kernel transport error: {0}")]
    Transport(String),

    /// Failure while terminating a session during teardown.
    /// Always logged, never propagated past the guard.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// Request validation errors (maps to HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Rate/burst limit exhaustion (maps to HTTP 429).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Missing or invalid bearer credentials (maps to HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal errors (maps to HTTP 500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert to an HTTP status code for the façade layer.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::SessionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::EvaluationFailed(_)
            | Error::Transport(_)
            | Error::Shutdown(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error kind for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SessionUnavailable(_) => "SessionUnavailable",
            Error::Timeout(_) => "Timeout",
            Error::EvaluationFailed(_) => "EvaluationFailed",
            Error::Transport(_) => "TransportError",
            Error::Shutdown(_) => "ShutdownError",
            Error::Validation(_) => "ValidationError",
            Error::QuotaExceeded(_) => "RateLimitExceeded",
            Error::Unauthorized(_) => "Unauthorized",
            Error::Internal(_) => "InternalError",
            Error::Serialization(_) => "SerializationError",
            Error::Io(_) => "IoError",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn session_unavailable(msg: impl Into<String>) -> Self {
        Self::SessionUnavailable(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn evaluation_failed(msg: impl Into<String>) -> Self {
        Self::EvaluationFailed(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn shutdown(msg: impl Into<String>) -> Self {
        Self::Shutdown(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
