//! Chat Handlers
//!
//! Group management, chat listing, attachments and history under `/chat`.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};

use crate::application::dto::request::{
    AddMembersRequest, DetailsQuery, NewGroupRequest, PageQuery, RemoveMemberRequest, RenameChatRequest,
};
use crate::application::dto::response::{
    ChatResponse, ChatsResponse, GroupsResponse, MessageResponse, MessagesResponse, SentMessageResponse,
};
use crate::application::services::{ChatService, MessageService};
use crate::presentation::http::extractors::{ApiJson, ApiQuery, MultipartForm, PathId, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

/// `POST /chat/new`
pub async fn new_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<NewGroupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let chat = state
        .chat_service()
        .create_group(auth.user_id, body.name.trim(), &body.members)
        .await?;

    tracing::info!(user_id = auth.user_id, chat_id = chat.id, "Group created");
    Ok((StatusCode::CREATED, Json(MessageResponse::ok("Group Created"))))
}

/// `GET /chat/my`
pub async fn my_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ChatsResponse>, AppError> {
    let chats = state.chat_service().my_chats(auth.user_id).await?;
    Ok(Json(ChatsResponse { success: true, chats }))
}

/// `GET /chat/my/groups`
pub async fn my_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<GroupsResponse>, AppError> {
    let groups = state.chat_service().my_groups(auth.user_id).await?;
    Ok(Json(GroupsResponse { success: true, groups }))
}

/// `PUT /chat/addMembers`
pub async fn add_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<AddMembersRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .chat_service()
        .add_members(auth.user_id, body.chat_id, &body.members)
        .await?;
    Ok(Json(MessageResponse::ok("Members added successfully")))
}

/// `PUT /chat/removeMember`
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<RemoveMemberRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .chat_service()
        .remove_member(auth.user_id, body.chat_id, body.user_id)
        .await?;
    Ok(Json(MessageResponse::ok("User removed successfully")))
}

/// `DELETE /chat/leave/{id}`
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(chat_id): PathId,
) -> Result<Json<MessageResponse>, AppError> {
    state.chat_service().leave_group(auth.user_id, chat_id).await?;
    Ok(Json(MessageResponse::ok("Leave Group Successfully")))
}

/// `POST /chat/message` - multipart `chatId` plus up to five `files`
pub async fn send_attachments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<SentMessageResponse>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let chat_id = parse_id(&form.text("chatId"), "chatId")?;
    let files = form.take_files("files");

    let message = state
        .message_service()
        .send_attachments(auth.user_id, chat_id, files)
        .await?;

    Ok(Json(SentMessageResponse { success: true, message }))
}

/// `GET /chat/message/{id}?page=`
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(chat_id): PathId,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let page = state
        .message_service()
        .get_messages(auth.user_id, chat_id, query.page.unwrap_or(1))
        .await?;

    Ok(Json(MessagesResponse {
        success: true,
        messages: page.messages,
        total_pages: page.total_pages,
    }))
}

/// `GET /chat/{id}?populate=true`
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(chat_id): PathId,
    ApiQuery(query): ApiQuery<DetailsQuery>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat = state
        .chat_service()
        .details(auth.user_id, chat_id, query.populate())
        .await?;
    Ok(Json(ChatResponse { success: true, chat }))
}

/// `PUT /chat/{id}`
pub async fn rename_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(chat_id): PathId,
    ValidatedJson(body): ValidatedJson<RenameChatRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .chat_service()
        .rename(auth.user_id, chat_id, body.name.trim())
        .await?;
    Ok(Json(MessageResponse::ok("Group renamed successfully")))
}

/// `DELETE /chat/{id}`
pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathId(chat_id): PathId,
) -> Result<Json<MessageResponse>, AppError> {
    state.chat_service().delete(auth.user_id, chat_id).await?;
    Ok(Json(MessageResponse::ok("Chat deleted successfully")))
}
