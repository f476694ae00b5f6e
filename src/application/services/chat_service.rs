//! Chat Service
//!
//! Group creation, membership changes, renames and deletion. Membership rules
//! are enforced by [`Chat`]; this service loads and stores chats and tells the
//! affected users about the change.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::application::events::{EventPublisher, ALERT, REFETCH_CHATS};
use crate::application::services::user_service::UserSummaryDto;
use crate::domain::{
    Chat, ChatRepository, MediaStore, MembershipError, MessageRepository, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Avatars shown for a group in listings.
const GROUP_AVATAR_COUNT: usize = 3;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Create a group owned by the caller
    async fn create_group(&self, user_id: i64, name: &str, members: &[i64]) -> Result<Chat, ChatError>;

    /// Every chat the caller belongs to, shaped for the chat list
    async fn my_chats(&self, user_id: i64) -> Result<Vec<ChatListItemDto>, ChatError>;

    /// Groups the caller created
    async fn my_groups(&self, user_id: i64) -> Result<Vec<GroupDto>, ChatError>;

    /// Add members to a group (creator only)
    async fn add_members(&self, user_id: i64, chat_id: i64, members: &[i64]) -> Result<Chat, ChatError>;

    /// Remove a member from a group (creator only)
    async fn remove_member(&self, user_id: i64, chat_id: i64, target_id: i64) -> Result<Chat, ChatError>;

    /// Leave a group
    async fn leave_group(&self, user_id: i64, chat_id: i64) -> Result<Chat, ChatError>;

    /// Chat details for a member, optionally with member profiles
    async fn details(&self, user_id: i64, chat_id: i64, populate: bool) -> Result<ChatDetailsDto, ChatError>;

    /// Rename a group (creator only)
    async fn rename(&self, user_id: i64, chat_id: i64, name: &str) -> Result<Chat, ChatError>;

    /// Delete a chat with its messages and stored files
    async fn delete(&self, user_id: i64, chat_id: i64) -> Result<(), ChatError>;
}

/// Entry in the caller's chat list
#[derive(Debug, Clone, Serialize)]
pub struct ChatListItemDto {
    pub id: String,
    pub group_chat: bool,
    pub avatar: Vec<String>,
    pub name: String,
    /// Other members' IDs
    pub members: Vec<String>,
}

/// Group created by the caller
#[derive(Debug, Clone, Serialize)]
pub struct GroupDto {
    pub id: String,
    pub group_chat: bool,
    pub name: String,
    pub avatar: Vec<String>,
}

/// Member list, either bare IDs or populated profiles
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatMembersDto {
    Ids(Vec<String>),
    Populated(Vec<UserSummaryDto>),
}

/// Single chat view
#[derive(Debug, Clone, Serialize)]
pub struct ChatDetailsDto {
    pub id: String,
    pub name: String,
    pub group_chat: bool,
    pub creator: Option<String>,
    pub members: ChatMembersDto,
    pub created_at: String,
    pub updated_at: String,
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("You are not allowed to access this chat")]
    AccessDenied,

    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotFound | ChatError::UserNotFound => AppError::NotFound(err.to_string()),
            ChatError::AccessDenied => AppError::Forbidden(err.to_string()),
            ChatError::Membership(MembershipError::NotCreator) => AppError::Forbidden(err.to_string()),
            ChatError::Membership(_) => AppError::BadRequest(err.to_string()),
            ChatError::Storage(e) => e,
        }
    }
}

/// ChatService implementation
pub struct ChatServiceImpl<U, C, Msg, M>
where
    U: UserRepository,
    C: ChatRepository,
    Msg: MessageRepository,
    M: MediaStore + ?Sized,
{
    user_repo: Arc<U>,
    chat_repo: Arc<C>,
    message_repo: Arc<Msg>,
    media: Arc<M>,
    events: Arc<dyn EventPublisher>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, C, Msg, M> ChatServiceImpl<U, C, Msg, M>
where
    U: UserRepository,
    C: ChatRepository,
    Msg: MessageRepository,
    M: MediaStore + ?Sized,
{
    pub fn new(
        user_repo: Arc<U>,
        chat_repo: Arc<C>,
        message_repo: Arc<Msg>,
        media: Arc<M>,
        events: Arc<dyn EventPublisher>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            chat_repo,
            message_repo,
            media,
            events,
            id_generator,
        }
    }

    async fn load(&self, chat_id: i64) -> Result<Chat, ChatError> {
        self.chat_repo.find_by_id(chat_id).await?.ok_or(ChatError::NotFound)
    }

    async fn load_user(&self, user_id: i64) -> Result<User, ChatError> {
        self.user_repo.find_by_id(user_id).await?.ok_or(ChatError::UserNotFound)
    }

    /// Users keyed by ID for every member of `chats`.
    async fn members_of(&self, chats: &[Chat]) -> Result<HashMap<i64, User>, ChatError> {
        let mut ids: Vec<i64> = chats.iter().flat_map(|c| c.members.iter().copied()).collect();
        ids.sort_unstable();
        ids.dedup();

        Ok(self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }

    fn alert(&self, users: &[i64], message: String, chat_id: Option<i64>) {
        let payload = match chat_id {
            Some(id) => json!({ "message": message, "chat_id": id.to_string() }),
            None => json!({ "message": message }),
        };
        self.events.publish(ALERT, users, payload);
    }

    fn refetch(&self, users: &[i64]) {
        self.events.publish(REFETCH_CHATS, users, Value::Null);
    }
}

fn avatars(members: &[i64], users: &HashMap<i64, User>) -> Vec<String> {
    members
        .iter()
        .filter_map(|id| users.get(id))
        .take(GROUP_AVATAR_COUNT)
        .map(|u| u.avatar.url.clone())
        .collect()
}

#[async_trait]
impl<U, C, Msg, M> ChatService for ChatServiceImpl<U, C, Msg, M>
where
    U: UserRepository + 'static,
    C: ChatRepository + 'static,
    Msg: MessageRepository + 'static,
    M: MediaStore + ?Sized + 'static,
{
    async fn create_group(&self, user_id: i64, name: &str, members: &[i64]) -> Result<Chat, ChatError> {
        let chat = Chat::new_group(self.id_generator.generate(), name, user_id, members)?;
        let chat = self.chat_repo.create(&chat).await?;

        self.alert(&chat.members, format!("Welcome to {} group", chat.name), None);
        self.refetch(&chat.members_except(user_id));

        tracing::info!(chat_id = chat.id, creator = user_id, members = chat.members.len(), "Group created");
        Ok(chat)
    }

    async fn my_chats(&self, user_id: i64) -> Result<Vec<ChatListItemDto>, ChatError> {
        let chats = self.chat_repo.find_by_member(user_id).await?;
        let users = self.members_of(&chats).await?;

        Ok(chats
            .into_iter()
            .map(|chat| {
                let other = chat.other_member(user_id).and_then(|id| users.get(&id));
                let (avatar, name) = if chat.group_chat {
                    (avatars(&chat.members, &users), chat.name.clone())
                } else {
                    (
                        other.map(|u| vec![u.avatar.url.clone()]).unwrap_or_default(),
                        other.map(|u| u.name.clone()).unwrap_or_else(|| chat.name.clone()),
                    )
                };

                ChatListItemDto {
                    id: chat.id.to_string(),
                    group_chat: chat.group_chat,
                    avatar,
                    name,
                    members: chat.members_except(user_id).iter().map(|id| id.to_string()).collect(),
                }
            })
            .collect())
    }

    async fn my_groups(&self, user_id: i64) -> Result<Vec<GroupDto>, ChatError> {
        let chats = self.chat_repo.find_by_creator(user_id).await?;
        let users = self.members_of(&chats).await?;

        Ok(chats
            .into_iter()
            .map(|chat| GroupDto {
                id: chat.id.to_string(),
                group_chat: chat.group_chat,
                avatar: avatars(&chat.members, &users),
                name: chat.name,
            })
            .collect())
    }

    async fn add_members(&self, user_id: i64, chat_id: i64, members: &[i64]) -> Result<Chat, ChatError> {
        let mut chat = self.load(chat_id).await?;
        chat.ensure_can_manage(user_id)?;

        let mut requested = members.to_vec();
        requested.sort_unstable();
        requested.dedup();
        let found: HashMap<i64, User> = self
            .user_repo
            .find_by_ids(&requested)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        if found.len() != requested.len() {
            return Err(ChatError::UserNotFound);
        }

        let added = chat.add_members(user_id, members)?;
        if added.is_empty() {
            return Ok(chat);
        }
        let chat = self.chat_repo.update(&chat).await?;

        let names: Vec<&str> = added
            .iter()
            .filter_map(|id| found.get(id).map(|u| u.name.as_str()))
            .collect();
        self.alert(
            &chat.members,
            format!("{} have been added to {} group", names.join(","), chat.name),
            Some(chat.id),
        );
        self.refetch(&chat.members);

        Ok(chat)
    }

    async fn remove_member(&self, user_id: i64, chat_id: i64, target_id: i64) -> Result<Chat, ChatError> {
        let mut chat = self.load(chat_id).await?;
        chat.ensure_can_manage(user_id)?;
        let target = self.load_user(target_id).await?;

        let before = chat.remove_member(user_id, target_id)?;
        let chat = self.chat_repo.update(&chat).await?;

        self.alert(
            &chat.members,
            format!("{} has been removed from the group", target.name),
            Some(chat.id),
        );
        self.refetch(&before);

        Ok(chat)
    }

    async fn leave_group(&self, user_id: i64, chat_id: i64) -> Result<Chat, ChatError> {
        let mut chat = self.load(chat_id).await?;
        let leaver = self.load_user(user_id).await?;

        let new_creator = {
            let mut rng = rand::rng();
            chat.leave(user_id, &mut rng)?
        };
        let chat = self.chat_repo.update(&chat).await?;

        if let Some(creator) = new_creator {
            tracing::info!(chat_id = chat.id, new_creator = creator, "Group creator reassigned");
        }

        self.alert(&chat.members, format!("{} has left the group", leaver.name), Some(chat.id));
        let mut notify = chat.members.clone();
        notify.push(user_id);
        self.refetch(&notify);

        Ok(chat)
    }

    async fn details(&self, user_id: i64, chat_id: i64, populate: bool) -> Result<ChatDetailsDto, ChatError> {
        let chat = self.load(chat_id).await?;
        if !chat.is_member(user_id) {
            return Err(ChatError::AccessDenied);
        }

        let members = if populate {
            let users = self.members_of(std::slice::from_ref(&chat)).await?;
            ChatMembersDto::Populated(
                chat.members
                    .iter()
                    .filter_map(|id| users.get(id).map(UserSummaryDto::from))
                    .collect(),
            )
        } else {
            ChatMembersDto::Ids(chat.members.iter().map(|id| id.to_string()).collect())
        };

        Ok(ChatDetailsDto {
            id: chat.id.to_string(),
            name: chat.name,
            group_chat: chat.group_chat,
            creator: chat.creator_id.map(|id| id.to_string()),
            members,
            created_at: chat.created_at.to_rfc3339(),
            updated_at: chat.updated_at.to_rfc3339(),
        })
    }

    async fn rename(&self, user_id: i64, chat_id: i64, name: &str) -> Result<Chat, ChatError> {
        let mut chat = self.load(chat_id).await?;
        chat.rename(user_id, name)?;
        let chat = self.chat_repo.update(&chat).await?;

        self.refetch(&chat.members);
        Ok(chat)
    }

    async fn delete(&self, user_id: i64, chat_id: i64) -> Result<(), ChatError> {
        let chat = self.load(chat_id).await?;
        chat.ensure_can_delete(user_id)?;

        let public_ids: Vec<String> = self
            .message_repo
            .attachments_for_chat(chat.id)
            .await?
            .into_iter()
            .map(|a| a.public_id)
            .collect();

        if !public_ids.is_empty() {
            self.media.delete(public_ids).await?;
        }
        self.chat_repo.delete(chat.id).await?;
        let removed = self.message_repo.delete_by_chat(chat.id).await?;

        tracing::info!(chat_id = chat.id, messages = removed, "Chat deleted");
        self.refetch(&chat.members);
        Ok(())
    }
}
