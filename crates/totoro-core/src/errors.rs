//! Error types with HTTP response conversion.
//!
//! [`AuthError`] is the failure vocabulary of the authentication gate and the
//! authorization policies. Its `Display` text is the public message: it never
//! says *why* a token was refused, and operational failures (missing
//! configuration, unreachable store) only ever surface as a generic server
//! error. The detail stays in the variant fields for logging.
//!
//! [`AppError`] is the general handler error, carrying a status code and an
//! [`anyhow::Error`].

use anyhow::Error;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

const SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// Authentication and authorization failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token was presented.
    #[error("Unauthorized: missing token")]
    Unauthenticated,

    /// A policy ran without an identity context (no gate upstream).
    #[error("Unauthorized: user not initialized")]
    ContextMissing,

    /// The token failed decoding or verification.
    #[error("Unauthorized: invalid token")]
    InvalidToken,

    /// The token is well-formed but no longer live in the shared store.
    #[error("Unauthorized: invalid token")]
    Revoked,

    /// The token belongs to an unverified (or role-less) user.
    #[error("Forbidden: unverified user")]
    Unverified,

    /// The caller is authenticated but not allowed.
    #[error("Forbidden: not allowed")]
    Forbidden,

    /// A required setting could not be resolved.
    #[error("Internal server error")]
    Misconfigured {
        /// Name of the missing or invalid setting.
        setting: String,
    },

    /// The shared store could not be reached or answered with an error.
    #[error("Internal server error")]
    Store {
        /// Underlying store error, for logs only.
        message: String,
    },
}

impl AuthError {
    pub fn misconfigured(setting: impl Into<String>) -> Self {
        Self::Misconfigured {
            setting: setting.into(),
        }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }

    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated
            | AuthError::ContextMissing
            | AuthError::InvalidToken
            | AuthError::Revoked => StatusCode::UNAUTHORIZED,
            AuthError::Unverified | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Misconfigured { .. } | AuthError::Store { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable label, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::ContextMissing => "context_missing",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Revoked => "revoked",
            AuthError::Unverified => "unverified",
            AuthError::Forbidden => "forbidden",
            AuthError::Misconfigured { .. } => "misconfigured",
            AuthError::Store { .. } => "store",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (self.status_code(), body).into_response()
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub retry_after: Option<u64>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            retry_after: None,
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    /// Attaches a retry hint, rendered as `Retry-After` and `retry_after_secs`.
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 5xx details never leave the process.
        let message = if self.status.is_server_error() {
            SERVER_ERROR_MESSAGE.to_string()
        } else {
            self.error.to_string()
        };

        let body = match self.retry_after {
            Some(secs) => json!({ "error": message, "retry_after_secs": secs }),
            None => json!({ "error": message }),
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        AppError::new(status, err)
    }
}
