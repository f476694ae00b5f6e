//! Admin Handlers
//!
//! Dashboard endpoints under `/admin`. Everything except `verify` sits
//! behind the admin session middleware.

use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;

use crate::application::dto::request::AdminLoginRequest;
use crate::application::dto::response::{
    AdminChatsResponse, AdminCheckResponse, AdminMessagesResponse, AdminUsersResponse, MessageResponse,
    StatsResponse,
};
use crate::application::services::AdminService;
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::http::handlers::auth::{expired_cookie, session_cookie};
use crate::presentation::middleware::ADMIN_COOKIE;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// `POST /admin/verify` - exchange the secret key for an admin session
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<AdminLoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let token = state.admin_service().verify_secret(&body.secret_key)?;

    tracing::info!("Admin session issued");
    let cookie = session_cookie(
        ADMIN_COOKIE,
        token,
        state.tokens.admin_ttl(),
        !state.settings.is_development(),
    );

    Ok((
        jar.add(cookie),
        Json(MessageResponse::ok("Authenticated Successfully, Welcome BOSS")),
    ))
}

/// `GET /admin/logout`
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(expired_cookie(ADMIN_COOKIE)),
        Json(MessageResponse::ok("Logged Out Successfully")),
    )
}

/// `GET /admin/` - reached only with a valid admin session
pub async fn check() -> Json<AdminCheckResponse> {
    Json(AdminCheckResponse { admin: true })
}

/// `GET /admin/users`
pub async fn all_users(State(state): State<AppState>) -> Result<Json<AdminUsersResponse>, AppError> {
    let data = state.admin_service().all_users().await?;
    Ok(Json(AdminUsersResponse { success: true, data }))
}

/// `GET /admin/chats`
pub async fn all_chats(State(state): State<AppState>) -> Result<Json<AdminChatsResponse>, AppError> {
    let data = state.admin_service().all_chats().await?;
    Ok(Json(AdminChatsResponse { success: true, data }))
}

/// `GET /admin/messages`
pub async fn all_messages(State(state): State<AppState>) -> Result<Json<AdminMessagesResponse>, AppError> {
    let messages = state.admin_service().all_messages().await?;
    Ok(Json(AdminMessagesResponse { success: true, messages }))
}

/// `GET /admin/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.admin_service().stats().await?;
    Ok(Json(StatsResponse { success: true, stats }))
}
