//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, session tokens
//! - **UserService**: Profiles, search, friend requests, friend list
//! - **ChatService**: Group lifecycle and membership changes
//! - **MessageService**: Live relay, attachment messages, history
//! - **AdminService**: Dashboard listings and statistics

pub mod admin_service;
pub mod auth_service;
pub mod chat_service;
pub mod message_service;
pub mod user_service;

pub use admin_service::{
    messages_chart, AdminChatDto, AdminError, AdminMessageDto, AdminService, AdminServiceImpl,
    AdminUserDto, StatsDto, CHART_DAYS,
};
pub use auth_service::{AuthError, AuthService, AuthServiceImpl, Claims, RegisterUser, TokenCodec};
pub use chat_service::{
    ChatDetailsDto, ChatError, ChatListItemDto, ChatMembersDto, ChatService, ChatServiceImpl, GroupDto,
};
pub use message_service::{
    MessageDto, MessageError, MessagePageDto, MessageService, MessageServiceImpl, SenderDto,
};
pub use user_service::{
    NotificationDto, RequestAnswer, UserDto, UserError, UserService, UserServiceImpl, UserSummaryDto,
};
