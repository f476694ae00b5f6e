//! User Service
//!
//! Profiles, user search, friend requests and the friend list. Friends are
//! simply the other members of a user's direct chats.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::application::events::{EventPublisher, NEW_REQUEST, REFETCH_CHATS};
use crate::domain::{
    Attachment, Chat, ChatRepository, FriendRequest, FriendRequestRepository, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get the caller's own profile
    async fn get_profile(&self, user_id: i64) -> Result<UserDto, UserError>;

    /// Search users by name, excluding the caller and existing friends
    async fn search(&self, user_id: i64, name: &str) -> Result<Vec<UserSummaryDto>, UserError>;

    /// Send a friend request
    async fn send_request(&self, user_id: i64, receiver_id: i64) -> Result<(), UserError>;

    /// Accept or reject a pending request addressed to the caller
    async fn answer_request(&self, user_id: i64, request_id: i64, accept: bool) -> Result<RequestAnswer, UserError>;

    /// Pending requests addressed to the caller
    async fn notifications(&self, user_id: i64) -> Result<Vec<NotificationDto>, UserError>;

    /// Friends, optionally only those not yet in `chat_id`
    async fn friends(&self, user_id: i64, chat_id: Option<i64>) -> Result<Vec<UserSummaryDto>, UserError>;
}

/// Full profile of the calling user
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub username: String,
    pub bio: String,
    pub avatar: Attachment,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            username: user.username,
            bio: user.bio,
            avatar: user.avatar,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Public view of another user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummaryDto {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl From<&User> for UserSummaryDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            avatar: user.avatar.url.clone(),
        }
    }
}

/// A pending friend request as shown to its receiver
#[derive(Debug, Clone, Serialize)]
pub struct NotificationDto {
    pub id: String,
    pub sender: UserSummaryDto,
}

/// Outcome of answering a friend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAnswer {
    Rejected,
    Accepted { sender_id: i64, chat_id: i64 },
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Chat not found")]
    ChatNotFound,

    #[error("Request not found")]
    RequestNotFound,

    #[error("Request already sent")]
    RequestExists,

    #[error("Cannot send a friend request to yourself")]
    SelfRequest,

    #[error("You are not authorized to accept this request")]
    NotReceiver,

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound | UserError::ChatNotFound | UserError::RequestNotFound => {
                AppError::NotFound(err.to_string())
            }
            UserError::RequestExists | UserError::SelfRequest => AppError::BadRequest(err.to_string()),
            UserError::NotReceiver => AppError::Forbidden(err.to_string()),
            UserError::Storage(e) => e,
        }
    }
}

/// UserService implementation
pub struct UserServiceImpl<U, C, R>
where
    U: UserRepository,
    C: ChatRepository,
    R: FriendRequestRepository,
{
    user_repo: Arc<U>,
    chat_repo: Arc<C>,
    request_repo: Arc<R>,
    events: Arc<dyn EventPublisher>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, C, R> UserServiceImpl<U, C, R>
where
    U: UserRepository,
    C: ChatRepository,
    R: FriendRequestRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        chat_repo: Arc<C>,
        request_repo: Arc<R>,
        events: Arc<dyn EventPublisher>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            chat_repo,
            request_repo,
            events,
            id_generator,
        }
    }

    /// Other members of the caller's direct chats, in chat order.
    async fn friend_ids(&self, user_id: i64) -> Result<Vec<i64>, UserError> {
        let chats = self.chat_repo.find_direct_by_member(user_id).await?;
        let mut ids: Vec<i64> = Vec::with_capacity(chats.len());
        for id in chats.iter().filter_map(|c: &Chat| c.other_member(user_id)) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl<U, C, R> UserService for UserServiceImpl<U, C, R>
where
    U: UserRepository + 'static,
    C: ChatRepository + 'static,
    R: FriendRequestRepository + 'static,
{
    async fn get_profile(&self, user_id: i64) -> Result<UserDto, UserError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .map(UserDto::from)
            .ok_or(UserError::NotFound)
    }

    async fn search(&self, user_id: i64, name: &str) -> Result<Vec<UserSummaryDto>, UserError> {
        let mut exclude = self.friend_ids(user_id).await?;
        exclude.push(user_id);

        let users = self.user_repo.search_by_name(name, &exclude).await?;
        Ok(users.iter().map(UserSummaryDto::from).collect())
    }

    async fn send_request(&self, user_id: i64, receiver_id: i64) -> Result<(), UserError> {
        if user_id == receiver_id {
            return Err(UserError::SelfRequest);
        }
        if self.user_repo.find_by_id(receiver_id).await?.is_none() {
            return Err(UserError::NotFound);
        }
        if self.request_repo.find_between(user_id, receiver_id).await?.is_some() {
            return Err(UserError::RequestExists);
        }

        let request = FriendRequest::new(self.id_generator.generate(), user_id, receiver_id);
        self.request_repo.create(&request).await?;

        self.events.publish(NEW_REQUEST, &[receiver_id], Value::Null);
        Ok(())
    }

    async fn answer_request(&self, user_id: i64, request_id: i64, accept: bool) -> Result<RequestAnswer, UserError> {
        let request = self
            .request_repo
            .find_by_id(request_id)
            .await?
            .ok_or(UserError::RequestNotFound)?;

        if !request.is_receiver(user_id) {
            return Err(UserError::NotReceiver);
        }

        if !accept {
            self.request_repo.delete(request.id).await?;
            return Ok(RequestAnswer::Rejected);
        }

        let sender = self
            .user_repo
            .find_by_id(request.sender_id)
            .await?
            .ok_or(UserError::NotFound)?;

        let chat = Chat::new_direct(
            self.id_generator.generate(),
            sender.name,
            request.sender_id,
            request.receiver_id,
        );
        self.chat_repo.create(&chat).await?;
        self.request_repo.delete(request.id).await?;

        self.events.publish(REFETCH_CHATS, &chat.members, Value::Null);

        Ok(RequestAnswer::Accepted {
            sender_id: request.sender_id,
            chat_id: chat.id,
        })
    }

    async fn notifications(&self, user_id: i64) -> Result<Vec<NotificationDto>, UserError> {
        let requests = self.request_repo.find_by_receiver(user_id).await?;
        let sender_ids: Vec<i64> = requests.iter().map(|r| r.sender_id).collect();
        let senders: HashMap<i64, User> = self
            .user_repo
            .find_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(requests
            .into_iter()
            .filter_map(|request| {
                senders.get(&request.sender_id).map(|sender| NotificationDto {
                    id: request.id.to_string(),
                    sender: UserSummaryDto::from(sender),
                })
            })
            .collect())
    }

    async fn friends(&self, user_id: i64, chat_id: Option<i64>) -> Result<Vec<UserSummaryDto>, UserError> {
        let mut ids = self.friend_ids(user_id).await?;

        if let Some(chat_id) = chat_id {
            let chat = self
                .chat_repo
                .find_by_id(chat_id)
                .await?
                .ok_or(UserError::ChatNotFound)?;
            ids.retain(|id| !chat.is_member(*id));
        }

        let users: HashMap<i64, User> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(UserSummaryDto::from))
            .collect())
    }
}
