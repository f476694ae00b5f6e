//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use super::handlers;
use crate::domain::MAX_ATTACHMENTS_PER_MESSAGE;
use crate::infrastructure::media::MEDIA_ROUTE;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{admin_middleware, auth_middleware};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Headroom for the non-file parts of a multipart body.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let media_dir = ServeDir::new(&state.settings.media.storage_path);

    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Realtime socket, authenticated at upgrade
        .route(
            "/socket",
            get(ws_handler).route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .nest_service(MEDIA_ROUTE, media_dir)
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/user", user_routes(state.clone()))
        .nest("/chat", chat_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}

/// Account routes; registration and login are public
fn user_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.settings.media.max_file_size + MULTIPART_OVERHEAD;

    let protected = Router::new()
        .route("/me", get(handlers::user::get_me))
        .route("/logout", get(handlers::auth::logout))
        .route("/search", get(handlers::user::search))
        .route("/sendRequest", put(handlers::user::send_request))
        .route("/acceptRequest", put(handlers::user::accept_request))
        .route("/notifications", get(handlers::user::notifications))
        .route("/friends", get(handlers::user::friends))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route(
            "/new",
            post(handlers::auth::register).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/login", post(handlers::auth::login))
        .merge(protected)
}

/// Chat routes (protected)
fn chat_routes(state: AppState) -> Router<AppState> {
    let upload_limit =
        state.settings.media.max_file_size * MAX_ATTACHMENTS_PER_MESSAGE + MULTIPART_OVERHEAD;

    Router::new()
        .route("/new", post(handlers::chat::new_group))
        .route("/my", get(handlers::chat::my_chats))
        .route("/my/groups", get(handlers::chat::my_groups))
        .route("/addMembers", put(handlers::chat::add_members))
        .route("/removeMember", put(handlers::chat::remove_member))
        .route("/leave/{id}", delete(handlers::chat::leave_group))
        .route(
            "/message",
            post(handlers::chat::send_attachments).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/message/{id}", get(handlers::chat::get_messages))
        .route(
            "/{id}",
            get(handlers::chat::get_chat)
                .put(handlers::chat::rename_group)
                .delete(handlers::chat::delete_chat),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Admin dashboard routes; only `verify` is public
fn admin_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(handlers::admin::check))
        .route("/users", get(handlers::admin::all_users))
        .route("/chats", get(handlers::admin::all_chats))
        .route("/messages", get(handlers::admin::all_messages))
        .route("/stats", get(handlers::admin::stats))
        .route_layer(middleware::from_fn_with_state(state, admin_middleware));

    Router::new()
        .route("/verify", post(handlers::admin::verify))
        .route("/logout", get(handlers::admin::logout))
        .merge(protected)
}
