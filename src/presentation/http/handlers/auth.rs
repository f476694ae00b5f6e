//! Authentication Handlers

use axum::{extract::{Multipart, State}, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::dto::request::{LoginRequest, RegisterRequest};
use crate::application::dto::response::{AuthResponse, MessageResponse};
use crate::application::services::{AuthService, RegisterUser, UserDto};
use crate::presentation::http::extractors::{MultipartForm, ValidatedJson};
use crate::presentation::middleware::{AuthUser, USER_COOKIE};
use crate::shared::error::AppError;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Build an HTTP-only session cookie.
///
/// Outside development the cookie is `Secure` and `SameSite=None` so a
/// separately hosted frontend can send it.
pub fn session_cookie(name: &'static str, token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// Cookie that overwrites and expires a session cookie.
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").max_age(time::Duration::ZERO).build()
}

/// `POST /user/new` - multipart registration with avatar
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let mut form = MultipartForm::read(multipart).await?;

    let body = RegisterRequest {
        name: form.text("name"),
        username: form.text("username"),
        password: form.text("password"),
        bio: form.text("bio"),
    };
    validate(&body)?;
    let avatar = form.take_files("avatar").into_iter().next();

    let input = RegisterUser {
        name: body.name,
        username: body.username,
        password: body.password,
        bio: body.bio,
    };
    let (user, token) = state.auth_service().register(input, avatar).await?;

    let cookie = session_cookie(
        USER_COOKIE,
        token,
        state.tokens.user_ttl(),
        !state.settings.is_development(),
    );

    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(AuthResponse {
            success: true,
            message: "User created".into(),
            user: UserDto::from(user),
        }),
    ))
}

/// `POST /user/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let (user, token) = state
        .auth_service()
        .login(&body.username, &body.password)
        .await?;

    tracing::info!(user_id = user.id, "User logged in");

    let cookie = session_cookie(
        USER_COOKIE,
        token,
        state.tokens.user_ttl(),
        !state.settings.is_development(),
    );

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            success: true,
            message: format!("Welcome Back, {}", user.name),
            user: UserDto::from(user),
        }),
    ))
}

/// `GET /user/logout`
pub async fn logout(
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    tracing::debug!(user_id = auth.user_id, "User logged out");
    (
        jar.add(expired_cookie(USER_COOKIE)),
        Json(MessageResponse::ok("Logged out successfully")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(USER_COOKIE, "tok".into(), chrono::Duration::days(15), true);

        assert_eq!(cookie.name(), USER_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(15)));
    }

    #[test]
    fn test_insecure_cookie_uses_lax() {
        let cookie = session_cookie(USER_COOKIE, "tok".into(), chrono::Duration::minutes(30), false);
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(30)));
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = expired_cookie(USER_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
