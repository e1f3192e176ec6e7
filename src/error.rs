//! Error taxonomy for the request pipeline and the API handlers.
//!
//! Every variant maps to a status code and a stable snake_case `code` that
//! the frontend can switch on. Responses are built by
//! [`crate::http::response::json_error`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::json_error;
use crate::users::StoreError;

/// Failures detected by the security pipeline ahead of route handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("CSRF token missing or invalid")]
    CsrfMismatch,
    #[error("Not authenticated")]
    MissingSession,
    #[error("Invalid session")]
    InvalidSession,
    #[error("Session expired")]
    SessionExpired,
    #[error("Insufficient role for this resource")]
    Forbidden,
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CsrfMismatch | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MissingSession | Self::InvalidSession | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "rate_limited",
            Self::CsrfMismatch => "csrf_mismatch",
            Self::MissingSession => "not_authenticated",
            Self::InvalidSession => "invalid_session",
            Self::SessionExpired => "session_expired",
            Self::Forbidden => "forbidden",
        }
    }

    /// Label used for rejection metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "rate_limit",
            Self::CsrfMismatch => "csrf",
            Self::MissingSession | Self::InvalidSession | Self::SessionExpired => "session",
            Self::Forbidden => "role",
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let mut response = json_error(self.status(), self.code(), self.to_string());
        if let Self::RateLimitExceeded { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

/// Failures raised by route handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email address has not been verified")]
    EmailNotVerified,
    #[error("{0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(email) => {
                Self::Conflict(format!("An account with email {email} already exists"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Pipeline(err) => err.into_response(),
            Self::BadRequest(detail) => json_error(StatusCode::BAD_REQUEST, "bad_request", detail),
            Self::InvalidCredentials => json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            Self::EmailNotVerified => json_error(
                StatusCode::FORBIDDEN,
                "email_not_verified",
                self.to_string(),
            ),
            Self::Conflict(detail) => json_error(StatusCode::CONFLICT, "conflict", detail),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        }
    }
}
