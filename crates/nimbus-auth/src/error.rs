//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Reason an authenticated request was refused by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    Inactive,
    Locked,
    Suspended,
    Unverified,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::Inactive => "inactive",
            ForbiddenReason::Locked => "locked",
            ForbiddenReason::Suspended => "suspended",
            ForbiddenReason::Unverified => "unverified",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password; the message never says which
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account state refuses login regardless of credential correctness
    #[error("Account is not available")]
    AccountNotUsable,

    #[error("Email is already registered")]
    EmailAlreadyExists,

    #[error("Password confirmation does not match")]
    PasswordMismatch,

    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Missing authorization header")]
    MissingToken,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Token subject no longer resolves to an account (guard path, 401)
    #[error("User not found")]
    UserNotFound,

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Account is inactive")]
    AccountInactive,

    /// Opaque wrapper for incidental failures on the auth path
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Malformed password hash: {0}")]
    HashFormat(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] nimbus_db::DbError),
}

impl AuthError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidRefreshToken
            | AuthError::MissingToken
            | AuthError::InvalidAuthHeader
            | AuthError::UserNotFound
            | AuthError::NotAuthenticated
            | AuthError::AuthenticationFailed
            | AuthError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AuthError::AccountNotUsable
            | AuthError::Forbidden(_)
            | AuthError::AccountInactive => StatusCode::FORBIDDEN,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::PasswordMismatch | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
            AuthError::HashFormat(_) | AuthError::PasswordHash(_) | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal failures are not described to the client
        let body = match &self {
            AuthError::HashFormat(_) | AuthError::PasswordHash(_) | AuthError::Database(_) => {
                json!({ "error": "Internal error" })
            }
            AuthError::Jwt(_) => json!({ "error": "Invalid token" }),
            AuthError::Forbidden(reason) => {
                json!({ "error": "Forbidden", "reason": reason.as_str() })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}
