//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Auth error: {0}")]
    Auth(#[from] nimbus_auth::AuthError),

    #[error("Database error: {0}")]
    Database(#[from] nimbus_db::DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Auth errors carry their own status/body mapping
        if let ApiError::Auth(e) = self {
            return e.into_response();
        }

        let (status, message) = match &self {
            ApiError::Auth(_) => unreachable!(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
            ApiError::Database(e) => match e {
                nimbus_db::DbError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                nimbus_db::DbError::Duplicate(msg) => (StatusCode::CONFLICT, msg.clone()),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                ),
            },
        };

        let body = axum::Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
