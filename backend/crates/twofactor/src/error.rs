//! Two-Factor Error Types
//!
//! This module provides the error taxonomy for the 2FA core, integrated
//! with the unified `kernel::error::AppError` system. Persistence and
//! crypto failures are translated into one of these variants before they
//! can reach a caller; internal causes are logged server-side only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Two-factor result type alias
pub type TwoFactorResult<T> = Result<T, TwoFactorError>;

/// Two-factor error variants
#[derive(Debug, Error)]
pub enum TwoFactorError {
    /// Login throttle denied the attempt; retryable after the delay
    #[error("Too many attempts, retry after {retry_after_secs}s")]
    ThrottleExceeded { retry_after_secs: u64 },

    /// Wrong email/password; terminal for this attempt
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Wrong one-time code; retryable, no extra lockout beyond the throttle
    #[error("Invalid verification code")]
    InvalidCode,

    /// No enrolled second factor where one is required; user must re-enroll
    #[error("Two-factor authentication is not set up")]
    ConfigurationMissing,

    /// Trusted device not found (revoking an unknown or foreign device)
    #[error("Trusted device not found")]
    DeviceNotFound,

    /// Device-trust storage unavailable; degraded mode, never blocks login
    #[error("Device trust ledger unavailable")]
    LedgerUnavailable,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TwoFactorError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TwoFactorError::ThrottleExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            TwoFactorError::InvalidCredentials | TwoFactorError::InvalidCode => {
                StatusCode::UNAUTHORIZED
            }
            TwoFactorError::ConfigurationMissing => StatusCode::PRECONDITION_FAILED,
            TwoFactorError::DeviceNotFound => StatusCode::NOT_FOUND,
            TwoFactorError::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            TwoFactorError::Database(_) | TwoFactorError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TwoFactorError::ThrottleExceeded { .. } => ErrorKind::TooManyRequests,
            TwoFactorError::InvalidCredentials | TwoFactorError::InvalidCode => {
                ErrorKind::Unauthorized
            }
            TwoFactorError::ConfigurationMissing => ErrorKind::PreconditionFailed,
            TwoFactorError::DeviceNotFound => ErrorKind::NotFound,
            TwoFactorError::LedgerUnavailable => ErrorKind::ServiceUnavailable,
            TwoFactorError::Database(_) | TwoFactorError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError; the throttle delay survives the conversion
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            TwoFactorError::ThrottleExceeded { retry_after_secs } => {
                err.with_retry_after(*retry_after_secs)
            }
            _ => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            TwoFactorError::Database(e) => {
                tracing::error!(error = %e, "Two-factor database error");
            }
            TwoFactorError::Internal(msg) => {
                tracing::error!(message = %msg, "Two-factor internal error");
            }
            TwoFactorError::LedgerUnavailable => {
                tracing::error!("Device trust ledger unavailable");
            }
            TwoFactorError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            TwoFactorError::ThrottleExceeded { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Login attempt throttled");
            }
            _ => {
                tracing::debug!(error = %self, "Two-factor error");
            }
        }
    }
}

impl IntoResponse for TwoFactorError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for TwoFactorError {
    fn from(err: AppError) -> Self {
        TwoFactorError::Internal(err.to_string())
    }
}
