//! Response DTOs
//!
//! Envelopes for API response bodies. Every body carries `success`.

use serde::Serialize;

use crate::application::services::{
    AdminChatDto, AdminMessageDto, AdminUserDto, ChatDetailsDto, ChatListItemDto, GroupDto,
    MessageDto, NotificationDto, StatsDto, UserDto, UserSummaryDto,
};

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Login / registration response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserDto,
}

/// Own profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserDto,
}

/// User search results
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<UserSummaryDto>,
}

/// Friend list
#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub success: bool,
    pub friends: Vec<UserSummaryDto>,
}

/// Pending friend requests
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub all_requests: Vec<NotificationDto>,
}

/// Answer to a friend request
#[derive(Debug, Serialize)]
pub struct AnswerRequestResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

/// Chat list
#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub success: bool,
    pub chats: Vec<ChatListItemDto>,
}

/// Groups created by the caller
#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub success: bool,
    pub groups: Vec<GroupDto>,
}

/// Single chat
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub chat: ChatDetailsDto,
}

/// Page of history
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<MessageDto>,
    pub total_pages: i64,
}

/// Stored attachment message
#[derive(Debug, Serialize)]
pub struct SentMessageResponse {
    pub success: bool,
    pub message: MessageDto,
}

/// `GET /admin/`
#[derive(Debug, Serialize)]
pub struct AdminCheckResponse {
    pub admin: bool,
}

/// Admin user listing
#[derive(Debug, Serialize)]
pub struct AdminUsersResponse {
    pub success: bool,
    pub data: Vec<AdminUserDto>,
}

/// Admin chat listing
#[derive(Debug, Serialize)]
pub struct AdminChatsResponse {
    pub success: bool,
    pub data: Vec<AdminChatDto>,
}

/// Admin message listing
#[derive(Debug, Serialize)]
pub struct AdminMessagesResponse {
    pub success: bool,
    pub messages: Vec<AdminMessageDto>,
}

/// Dashboard statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsDto,
}
