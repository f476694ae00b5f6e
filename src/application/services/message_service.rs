//! Message Service
//!
//! Relays live messages to chat members, stores attachment messages and
//! serves paged history.
//!
//! Live messages are broadcast before they are written. A failed write is
//! logged and reported to the caller, but the broadcast is never retracted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::application::events::{EventPublisher, NEW_MESSAGE, NEW_MESSAGE_ALERT};
use crate::domain::{
    page_offset, total_pages, Attachment, ChatRepository, MediaStore, Message, MessageRepository,
    UploadedFile, User, UserRepository, MAX_ATTACHMENTS_PER_MESSAGE, MESSAGES_PER_PAGE,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Broadcast a text message to `members`, then store it
    async fn relay_message(
        &self,
        sender: &SenderDto,
        chat_id: i64,
        members: &[i64],
        content: String,
    ) -> Result<MessageDto, MessageError>;

    /// Store uploaded files as a message and notify the chat
    async fn send_attachments(
        &self,
        user_id: i64,
        chat_id: i64,
        files: Vec<UploadedFile>,
    ) -> Result<MessageDto, MessageError>;

    /// One page of history, oldest message first within the page
    async fn get_messages(&self, user_id: i64, chat_id: i64, page: i64) -> Result<MessagePageDto, MessageError>;
}

/// Message author as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderDto {
    #[serde(with = "crate::shared::snowflake::id_string")]
    pub id: i64,
    pub name: String,
}

impl From<&User> for SenderDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Message data transfer object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDto {
    pub id: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub sender: SenderDto,
    pub chat_id: String,
    pub created_at: String,
}

impl MessageDto {
    fn new(message: &Message, sender: SenderDto) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content.clone(),
            attachments: message.attachments.clone(),
            sender,
            chat_id: message.chat_id.to_string(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// A page of chat history
#[derive(Debug, Clone, Serialize)]
pub struct MessagePageDto {
    pub messages: Vec<MessageDto>,
    pub total_pages: i64,
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Chat not found")]
    ChatNotFound,

    #[error("You are not allowed to access this chat")]
    Forbidden,

    #[error("Please upload attachments")]
    NoAttachments,

    #[error("Files cannot be more than {MAX_ATTACHMENTS_PER_MESSAGE}")]
    TooManyAttachments,

    #[error("User not found")]
    UserNotFound,

    #[error("Message {message_id} was delivered but not stored")]
    NotPersisted {
        message_id: i64,
        #[source]
        source: AppError,
    },

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::ChatNotFound | MessageError::UserNotFound => AppError::NotFound(err.to_string()),
            MessageError::Forbidden => AppError::Forbidden(err.to_string()),
            MessageError::NoAttachments | MessageError::TooManyAttachments => {
                AppError::BadRequest(err.to_string())
            }
            MessageError::NotPersisted { source, .. } => source,
            MessageError::Storage(e) => e,
        }
    }
}

/// MessageService implementation
pub struct MessageServiceImpl<U, C, Msg, M>
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

impl<U, C, Msg, M> MessageServiceImpl<U, C, Msg, M>
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

    fn broadcast(&self, members: &[i64], dto: &MessageDto) {
        self.events.publish(
            NEW_MESSAGE,
            members,
            json!({ "chat_id": dto.chat_id, "message": dto }),
        );
        self.events
            .publish(NEW_MESSAGE_ALERT, members, json!({ "chat_id": dto.chat_id }));
    }
}

#[async_trait]
impl<U, C, Msg, M> MessageService for MessageServiceImpl<U, C, Msg, M>
where
    U: UserRepository + 'static,
    C: ChatRepository + 'static,
    Msg: MessageRepository + 'static,
    M: MediaStore + ?Sized + 'static,
{
    async fn relay_message(
        &self,
        sender: &SenderDto,
        chat_id: i64,
        members: &[i64],
        content: String,
    ) -> Result<MessageDto, MessageError> {
        let message = Message {
            id: self.id_generator.generate(),
            sender_id: sender.id,
            chat_id,
            content,
            attachments: Vec::new(),
            created_at: Utc::now(),
        };
        let dto = MessageDto::new(&message, sender.clone());

        self.broadcast(members, &dto);

        if let Err(source) = self.message_repo.create(&message).await {
            tracing::error!(
                message_id = message.id,
                chat_id,
                sender_id = sender.id,
                error = %source,
                "Failed to store relayed message"
            );
            return Err(MessageError::NotPersisted {
                message_id: message.id,
                source,
            });
        }

        Ok(dto)
    }

    async fn send_attachments(
        &self,
        user_id: i64,
        chat_id: i64,
        files: Vec<UploadedFile>,
    ) -> Result<MessageDto, MessageError> {
        if files.is_empty() {
            return Err(MessageError::NoAttachments);
        }
        if files.len() > MAX_ATTACHMENTS_PER_MESSAGE {
            return Err(MessageError::TooManyAttachments);
        }

        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await?
            .ok_or(MessageError::ChatNotFound)?;
        if !chat.is_member(user_id) {
            return Err(MessageError::Forbidden);
        }
        let sender = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(MessageError::UserNotFound)?;

        let attachments = self.media.upload(files).await?;

        let message = Message {
            id: self.id_generator.generate(),
            sender_id: user_id,
            chat_id,
            content: String::new(),
            attachments,
            created_at: Utc::now(),
        };
        let message = self.message_repo.create(&message).await?;

        let dto = MessageDto::new(&message, SenderDto::from(&sender));
        self.broadcast(&chat.members, &dto);

        Ok(dto)
    }

    async fn get_messages(&self, user_id: i64, chat_id: i64, page: i64) -> Result<MessagePageDto, MessageError> {
        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await?
            .ok_or(MessageError::ChatNotFound)?;
        if !chat.is_member(user_id) {
            return Err(MessageError::Forbidden);
        }

        let mut messages = self
            .message_repo
            .find_page(chat_id, page_offset(page), MESSAGES_PER_PAGE)
            .await?;
        let total = self.message_repo.count_by_chat(chat_id).await?;

        let mut sender_ids: Vec<i64> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let senders: HashMap<i64, User> = self
            .user_repo
            .find_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        // Pages are fetched newest first but shown oldest first.
        messages.reverse();

        let messages = messages
            .iter()
            .map(|m| {
                let sender = senders.get(&m.sender_id).map(SenderDto::from).unwrap_or(SenderDto {
                    id: m.sender_id,
                    name: String::new(),
                });
                MessageDto::new(m, sender)
            })
            .collect();

        Ok(MessagePageDto {
            messages,
            total_pages: total_pages(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::RecordingPublisher;
    use crate::domain::{
        Chat, MockChatRepository, MockMediaStore, MockMessageRepository, MockUserRepository,
    };
    use crate::shared::snowflake::DEFAULT_EPOCH;
    use chrono::Duration;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    type Svc = MessageServiceImpl<MockUserRepository, MockChatRepository, MockMessageRepository, MockMediaStore>;

    fn build(
        users: MockUserRepository,
        chats: MockChatRepository,
        messages: MockMessageRepository,
        media: MockMediaStore,
    ) -> (Svc, Arc<RecordingPublisher>) {
        let events = Arc::new(RecordingPublisher::default());
        let svc = MessageServiceImpl::new(
            Arc::new(users),
            Arc::new(chats),
            Arc::new(messages),
            Arc::new(media),
            events.clone(),
            Arc::new(SnowflakeGenerator::new(1, DEFAULT_EPOCH)),
        );
        (svc, events)
    }

    fn alice() -> SenderDto {
        SenderDto { id: 1, name: "Alice".into() }
    }

    fn file() -> UploadedFile {
        UploadedFile {
            file_name: Some("cat.jpg".into()),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0xFF, 0xD8],
        }
    }

    // ==========================================================================
    // Relay Tests
    // ==========================================================================

    #[tokio::test]
    async fn test_relay_broadcasts_and_persists() {
        let mut messages = MockMessageRepository::new();
        messages
            .expect_create()
            .withf(|m: &Message| m.sender_id == 1 && m.chat_id == 50 && m.content == "hi")
            .times(1)
            .returning(|m| Ok(m.clone()));

        let (svc, events) = build(
            MockUserRepository::new(),
            MockChatRepository::new(),
            messages,
            MockMediaStore::new(),
        );

        let dto = svc.relay_message(&alice(), 50, &[1, 2], "hi".into()).await.unwrap();

        let new_message = events.named(NEW_MESSAGE);
        assert_eq!(new_message.len(), 1);
        assert_eq!(new_message[0].users, vec![1, 2]);
        assert_eq!(new_message[0].payload["chat_id"], "50");
        assert_eq!(new_message[0].payload["message"]["content"], "hi");
        assert_eq!(new_message[0].payload["message"]["id"], dto.id.as_str());
        assert_eq!(new_message[0].payload["message"]["sender"]["name"], "Alice");

        let alerts = events.named(NEW_MESSAGE_ALERT);
        assert_eq!(alerts[0].users, vec![1, 2]);
        assert_eq!(alerts[0].payload, json!({ "chat_id": "50" }));
    }

    #[tokio::test]
    async fn test_relay_failure_keeps_broadcast() {
        let mut messages = MockMessageRepository::new();
        messages
            .expect_create()
            .returning(|_| Err(AppError::Internal("db down".into())));

        let (svc, events) = build(
            MockUserRepository::new(),
            MockChatRepository::new(),
            messages,
            MockMediaStore::new(),
        );

        let err = svc.relay_message(&alice(), 50, &[2], "hi".into()).await.unwrap_err();

        assert!(matches!(err, MessageError::NotPersisted { .. }));
        assert_eq!(events.named(NEW_MESSAGE).len(), 1);
        assert_eq!(events.named(NEW_MESSAGE_ALERT).len(), 1);
    }

    // ==========================================================================
    // Attachment Tests
    // ==========================================================================

    #[tokio::test]
    async fn test_attachment_count_bounds() {
        let (svc, _) = build(
            MockUserRepository::new(),
            MockChatRepository::new(),
            MockMessageRepository::new(),
            MockMediaStore::new(),
        );

        assert!(matches!(svc.send_attachments(1, 50, vec![]).await, Err(MessageError::NoAttachments)));
        let six = (0..6).map(|_| file()).collect();
        assert!(matches!(svc.send_attachments(1, 50, six).await, Err(MessageError::TooManyAttachments)));
    }

    #[tokio::test]
    async fn test_attachment_requires_membership() {
        let mut chats = MockChatRepository::new();
        chats
            .expect_find_by_id()
            .returning(|id| Ok(Some(Chat::new_direct(id, "x", 2, 3))));

        let mut media = MockMediaStore::new();
        media.expect_upload().never();

        let (svc, _) = build(MockUserRepository::new(), chats, MockMessageRepository::new(), media);
        assert!(matches!(svc.send_attachments(1, 50, vec![file()]).await, Err(MessageError::Forbidden)));
    }

    #[tokio::test]
    async fn test_attachment_message_stored_and_broadcast() {
        let mut chats = MockChatRepository::new();
        chats
            .expect_find_by_id()
            .returning(|id| Ok(Some(Chat::new_direct(id, "x", 1, 2))));

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                name: "Alice".into(),
                ..User::default()
            }))
        });

        let mut media = MockMediaStore::new();
        media.expect_upload().times(1).returning(|files| {
            Ok(files
                .iter()
                .enumerate()
                .map(|(i, _)| Attachment {
                    public_id: format!("{i}.jpg"),
                    url: format!("http://localhost/media/{i}.jpg"),
                })
                .collect())
        });

        let mut messages = MockMessageRepository::new();
        messages
            .expect_create()
            .withf(|m: &Message| m.content.is_empty() && m.attachments.len() == 2)
            .returning(|m| Ok(m.clone()));

        let (svc, events) = build(users, chats, messages, media);
        let dto = svc.send_attachments(1, 50, vec![file(), file()]).await.unwrap();

        assert_eq!(dto.attachments.len(), 2);
        assert_eq!(events.named(NEW_MESSAGE)[0].users, vec![1, 2]);
    }

    // ==========================================================================
    // History Tests
    // ==========================================================================

    #[tokio::test]
    async fn test_history_page_is_oldest_first() {
        let mut chats = MockChatRepository::new();
        chats
            .expect_find_by_id()
            .returning(|id| Ok(Some(Chat::new_direct(id, "x", 1, 2))));

        let now = Utc::now();
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_page()
            .with(eq(50), eq(20), eq(MESSAGES_PER_PAGE))
            .returning(move |chat_id, _, _| {
                Ok((0..3)
                    .map(|i| Message {
                        id: 100 - i,
                        sender_id: 2,
                        chat_id,
                        content: format!("m{}", 100 - i),
                        attachments: vec![],
                        created_at: now - Duration::seconds(i),
                    })
                    .collect())
            });
        messages.expect_count_by_chat().returning(|_| Ok(23));

        let mut users = MockUserRepository::new();
        users.expect_find_by_ids().returning(|_| {
            Ok(vec![User {
                id: 2,
                name: "Bob".into(),
                ..User::default()
            }])
        });

        let (svc, _) = build(users, chats, messages, MockMediaStore::new());
        let page = svc.get_messages(1, 50, 2).await.unwrap();

        assert_eq!(page.total_pages, 2);
        let ids: Vec<&str> = page.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["98", "99", "100"]);
        assert_eq!(page.messages[0].sender.name, "Bob");
    }

    #[tokio::test]
    async fn test_history_requires_membership() {
        let mut chats = MockChatRepository::new();
        chats
            .expect_find_by_id()
            .returning(|id| Ok(Some(Chat::new_direct(id, "x", 2, 3))));

        let (svc, _) = build(MockUserRepository::new(), chats, MockMessageRepository::new(), MockMediaStore::new());
        assert!(matches!(svc.get_messages(1, 50, 1).await, Err(MessageError::Forbidden)));
    }
}
