use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::toast::Toast;
use crate::services::{AuthError, OccupancyError};

/// Failure of a web action. Rendered as an error toast with a status code
/// per kind so the page can tell them apart.
#[derive(Debug)]
pub enum WebError {
    Validation(String),

    Conflict(String),

    Forbidden(String),

    NotFound(String),

    Unauthorized(String),

    Internal(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for WebError {}

impl WebError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub fn not_logged_in() -> Self {
        Self::Unauthorized("Please log in first".to_string())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            Self::Validation(msg)
            | Self::Conflict(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg) => msg,
        };

        Toast::error(message).into_response_with_status(status)
    }
}

impl From<OccupancyError> for WebError {
    fn from(err: OccupancyError) -> Self {
        match err {
            OccupancyError::Validation(msg) => Self::Validation(msg),
            OccupancyError::Conflict(msg) => Self::Conflict(msg),
            OccupancyError::Forbidden(msg) => Self::Forbidden(msg),
            OccupancyError::NotFound(msg) => Self::NotFound(msg),
            OccupancyError::Database(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for WebError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::NotFound(msg) => Self::NotFound(msg),
            AuthError::Database(msg) | AuthError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
