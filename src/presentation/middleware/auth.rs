//! Authentication Middleware
//!
//! Session validation for user and admin routes. Tokens come from the
//! session cookie, or from an `Authorization: Bearer` header for clients
//! that cannot hold cookies.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::application::services::AuthError;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Cookie carrying the user session token
pub const USER_COOKIE: &str = "chatline-token";

/// Cookie carrying the admin session token
pub const ADMIN_COOKIE: &str = "chatline-admin-token";

/// Authenticated user extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Cookie first, then bearer header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap, cookie: &str) -> Option<String> {
    jar.get(cookie)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| bearer_token(headers).map(String::from))
}

fn session_error(err: AuthError) -> AppError {
    match err {
        AuthError::TokenExpired => AppError::Unauthorized("Session expired, please login again".into()),
        _ => AppError::Unauthorized("Invalid session token".into()),
    }
}

/// Require a valid user session and attach [`AuthUser`]
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers(), USER_COOKIE)
        .ok_or_else(|| AppError::Unauthorized("Please login to access this route".into()))?;

    let user_id = state.tokens.verify_user(&token).map_err(session_error)?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

/// Require a valid admin session
pub async fn admin_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers(), ADMIN_COOKIE)
        .ok_or_else(|| AppError::Unauthorized("Only Admin can access this route".into()))?;

    state.tokens.verify_admin(&token).map_err(|_| {
        AppError::Unauthorized("Only Admin can access this route".into())
    })?;

    Ok(next.run(request).await)
}
