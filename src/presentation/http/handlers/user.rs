//! User Handlers
//!
//! Profile, search and friend request endpoints under `/user`.

use axum::{extract::State, Extension, Json};

use crate::application::dto::request::{AnswerFriendRequest, FriendsQuery, SearchQuery, SendFriendRequest};
use crate::application::dto::response::{
    AnswerRequestResponse, FriendsResponse, MessageResponse, NotificationsResponse, ProfileResponse,
    UsersResponse,
};
use crate::application::services::{RequestAnswer, UserService};
use crate::presentation::http::extractors::{ApiJson, ApiQuery};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

/// `GET /user/me`
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state.user_service().get_profile(auth.user_id).await?;
    Ok(Json(ProfileResponse { success: true, user }))
}

/// `GET /user/search?name=` - users not yet befriended
pub async fn search(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.user_service().search(auth.user_id, query.name.trim()).await?;
    Ok(Json(UsersResponse { success: true, users }))
}

/// `PUT /user/sendRequest`
pub async fn send_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<SendFriendRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.user_service().send_request(auth.user_id, body.user_id).await?;
    Ok(Json(MessageResponse::ok("Friend Request Sent")))
}

/// `PUT /user/acceptRequest`
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<AnswerFriendRequest>,
) -> Result<Json<AnswerRequestResponse>, AppError> {
    let answer = state
        .user_service()
        .answer_request(auth.user_id, body.request_id, body.accept)
        .await?;

    let response = match answer {
        RequestAnswer::Rejected => AnswerRequestResponse {
            success: true,
            message: "Friend Request Rejected".into(),
            sender_id: None,
        },
        RequestAnswer::Accepted { sender_id, .. } => AnswerRequestResponse {
            success: true,
            message: "Friend Request Accepted".into(),
            sender_id: Some(sender_id.to_string()),
        },
    };
    Ok(Json(response))
}

/// `GET /user/notifications` - pending requests addressed to the caller
pub async fn notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let all_requests = state.user_service().notifications(auth.user_id).await?;
    Ok(Json(NotificationsResponse { success: true, all_requests }))
}

/// `GET /user/friends?chatId=` - friends, optionally minus a chat's members
pub async fn friends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<FriendsQuery>,
) -> Result<Json<FriendsResponse>, AppError> {
    let chat_id = query
        .chat_id
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_id(raw, "chatId"))
        .transpose()?;

    let friends = state.user_service().friends(auth.user_id, chat_id).await?;
    Ok(Json(FriendsResponse { success: true, friends }))
}
