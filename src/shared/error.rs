//! Application Error Types
//!
//! Centralized error handling with Axum integration. Every handler funnels its
//! failures into [`AppError`], which normalizes storage errors and renders the
//! JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde::Serialize;

/// Whether raw error details are attached to responses (development only).
static EXPOSE_DETAILS: OnceCell<bool> = OnceCell::new();

/// Enable or disable raw error details in responses.
///
/// Called once during startup; later calls are ignored.
pub fn set_expose_details(expose: bool) {
    let _ = EXPOSE_DETAILS.set(expose);
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Error for an identifier that could not be parsed.
    pub fn invalid_format(field: &str) -> Self {
        AppError::BadRequest(format!("Invalid format of {}", field))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// PostgreSQL SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for invalid text representation (bad casts).
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Map a database constraint name like `users_username_key` to its field.
fn constraint_field(constraint: &str) -> String {
    let trimmed = constraint
        .strip_suffix("_key")
        .or_else(|| constraint.strip_suffix("_idx"))
        .unwrap_or(constraint);

    match trimmed.split_once('_') {
        Some((_table, field)) if !field.is_empty() => field.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Remap known storage-layer failures to client errors.
fn normalize_database(err: &sqlx::Error) -> Option<(StatusCode, u16, String)> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };

    match db_err.code().as_deref() {
        Some(UNIQUE_VIOLATION) => {
            let field = db_err
                .constraint()
                .map(constraint_field)
                .unwrap_or_else(|| "unknown".into());
            Some((
                StatusCode::BAD_REQUEST,
                10005,
                format!("Duplicate field - {}", field),
            ))
        }
        Some(INVALID_TEXT_REPRESENTATION) => Some((
            StatusCode::BAD_REQUEST,
            10002,
            "Invalid format of input".into(),
        )),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 10004, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Database(e) => match normalize_database(e) {
                Some(mapped) => mapped,
                None => {
                    tracing::error!("Database error: {}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
                }
            },
        };

        let body = ErrorResponse {
            success: false,
            code,
            message,
            error: expose_details().then(|| self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
