//! Admin Service
//!
//! Dashboard data for the operator: secret-key login, full listings of users,
//! chats and messages, and aggregate statistics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::application::services::auth_service::TokenCodec;
use crate::application::services::user_service::UserSummaryDto;
use crate::domain::{Attachment, ChatFilter, ChatRepository, MessageRepository, User, UserRepository};
use crate::shared::error::AppError;

/// Days covered by the message chart.
pub const CHART_DAYS: usize = 7;

/// Admin service trait
#[async_trait]
pub trait AdminService: Send + Sync {
    /// Exchange the admin secret for a session token
    fn verify_secret(&self, secret: &str) -> Result<String, AdminError>;

    /// Every user with group and friend counts
    async fn all_users(&self) -> Result<Vec<AdminUserDto>, AdminError>;

    /// Every chat with members, creator and message count
    async fn all_chats(&self) -> Result<Vec<AdminChatDto>, AdminError>;

    /// Every message with its sender
    async fn all_messages(&self) -> Result<Vec<AdminMessageDto>, AdminError>;

    /// Totals and the per-day message chart
    async fn stats(&self) -> Result<StatsDto, AdminError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUserDto {
    pub id: String,
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub groups: usize,
    pub friends: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatorDto {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminChatDto {
    pub id: String,
    pub group_chat: bool,
    pub name: String,
    pub avatar: Vec<String>,
    pub members: Vec<UserSummaryDto>,
    pub creator: CreatorDto,
    pub total_members: usize,
    pub total_messages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminMessageDto {
    pub id: String,
    pub attachments: Vec<Attachment>,
    pub content: String,
    pub created_at: String,
    pub chat_id: String,
    pub group_chat: bool,
    pub sender: UserSummaryDto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsDto {
    pub groups_count: i64,
    pub users_count: i64,
    pub messages_count: i64,
    pub total_chats_count: i64,
    pub messages_chart: [u32; CHART_DAYS],
}

/// Admin service errors
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Invalid Admin Secret Key")]
    InvalidSecret,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::InvalidSecret => AppError::Unauthorized(err.to_string()),
            AdminError::Internal(msg) => AppError::Internal(msg),
            AdminError::Storage(e) => e,
        }
    }
}

/// Bucket message timestamps into the last [`CHART_DAYS`] days.
///
/// Slot `CHART_DAYS - 1` holds the most recent 24 hours, slot 0 the oldest.
/// Timestamps in the future or older than the window are ignored.
pub fn messages_chart(now: DateTime<Utc>, timestamps: &[DateTime<Utc>]) -> [u32; CHART_DAYS] {
    let mut chart = [0u32; CHART_DAYS];
    let day_ms = Duration::days(1).num_milliseconds();

    for ts in timestamps {
        let age_ms = (now - *ts).num_milliseconds();
        if age_ms < 0 {
            continue;
        }
        let days_ago = (age_ms / day_ms) as usize;
        if days_ago < CHART_DAYS {
            chart[CHART_DAYS - 1 - days_ago] += 1;
        }
    }
    chart
}

fn digest(value: &str) -> Vec<u8> {
    Sha256::digest(value.as_bytes()).to_vec()
}

/// AdminService implementation
pub struct AdminServiceImpl<U, C, Msg>
where
    U: UserRepository,
    C: ChatRepository,
    Msg: MessageRepository,
{
    user_repo: Arc<U>,
    chat_repo: Arc<C>,
    message_repo: Arc<Msg>,
    tokens: TokenCodec,
    secret_digest: Vec<u8>,
}

impl<U, C, Msg> AdminServiceImpl<U, C, Msg>
where
    U: UserRepository,
    C: ChatRepository,
    Msg: MessageRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        chat_repo: Arc<C>,
        message_repo: Arc<Msg>,
        tokens: TokenCodec,
        admin_secret: &str,
    ) -> Self {
        Self {
            user_repo,
            chat_repo,
            message_repo,
            tokens,
            secret_digest: digest(admin_secret),
        }
    }

    async fn users_by_id(&self) -> Result<HashMap<i64, User>, AdminError> {
        Ok(self
            .user_repo
            .list_all()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }
}

#[async_trait]
impl<U, C, Msg> AdminService for AdminServiceImpl<U, C, Msg>
where
    U: UserRepository + 'static,
    C: ChatRepository + 'static,
    Msg: MessageRepository + 'static,
{
    fn verify_secret(&self, secret: &str) -> Result<String, AdminError> {
        if digest(secret) != self.secret_digest {
            tracing::warn!("Admin login with wrong secret key");
            return Err(AdminError::InvalidSecret);
        }
        self.tokens
            .issue_admin()
            .map_err(|e| AdminError::Internal(e.to_string()))
    }

    async fn all_users(&self) -> Result<Vec<AdminUserDto>, AdminError> {
        let users = self.user_repo.list_all().await?;
        let chats = self.chat_repo.list_all().await?;

        let mut groups: HashMap<i64, usize> = HashMap::new();
        let mut friends: HashMap<i64, usize> = HashMap::new();
        for chat in &chats {
            let counter = if chat.group_chat { &mut groups } else { &mut friends };
            for member in &chat.members {
                *counter.entry(*member).or_default() += 1;
            }
        }

        Ok(users
            .into_iter()
            .map(|u| AdminUserDto {
                id: u.id.to_string(),
                groups: groups.get(&u.id).copied().unwrap_or(0),
                friends: friends.get(&u.id).copied().unwrap_or(0),
                name: u.name,
                username: u.username,
                avatar: u.avatar.url,
            })
            .collect())
    }

    async fn all_chats(&self) -> Result<Vec<AdminChatDto>, AdminError> {
        let chats = self.chat_repo.list_all().await?;
        let users = self.users_by_id().await?;

        let mut out = Vec::with_capacity(chats.len());
        for chat in chats {
            let total_messages = self.message_repo.count_by_chat(chat.id).await?;
            let members: Vec<UserSummaryDto> = chat
                .members
                .iter()
                .filter_map(|id| users.get(id).map(UserSummaryDto::from))
                .collect();
            let creator = chat.creator_id.and_then(|id| users.get(&id));

            out.push(AdminChatDto {
                id: chat.id.to_string(),
                group_chat: chat.group_chat,
                name: chat.name,
                avatar: members.iter().take(3).map(|m| m.avatar.clone()).collect(),
                total_members: chat.members.len(),
                members,
                creator: CreatorDto {
                    name: creator.map(|u| u.name.clone()).unwrap_or_else(|| "None".into()),
                    avatar: creator.map(|u| u.avatar.url.clone()).unwrap_or_default(),
                },
                total_messages,
            });
        }
        Ok(out)
    }

    async fn all_messages(&self) -> Result<Vec<AdminMessageDto>, AdminError> {
        let messages = self.message_repo.list_all().await?;
        let users = self.users_by_id().await?;
        let group_flags: HashMap<i64, bool> = self
            .chat_repo
            .list_all()
            .await?
            .into_iter()
            .map(|c| (c.id, c.group_chat))
            .collect();

        Ok(messages
            .into_iter()
            .map(|m| AdminMessageDto {
                id: m.id.to_string(),
                content: m.content,
                created_at: m.created_at.to_rfc3339(),
                chat_id: m.chat_id.to_string(),
                group_chat: group_flags.get(&m.chat_id).copied().unwrap_or(false),
                sender: users.get(&m.sender_id).map(UserSummaryDto::from).unwrap_or(UserSummaryDto {
                    id: m.sender_id.to_string(),
                    name: String::new(),
                    avatar: String::new(),
                }),
                attachments: m.attachments,
            })
            .collect())
    }

    async fn stats(&self) -> Result<StatsDto, AdminError> {
        let now = Utc::now();
        let groups_count = self
            .chat_repo
            .count(ChatFilter {
                group_chat: Some(true),
                ..ChatFilter::default()
            })
            .await?;
        let users_count = self.user_repo.count().await?;
        let messages_count = self.message_repo.count_all().await?;
        let total_chats_count = self.chat_repo.count(ChatFilter::default()).await?;

        let recent = self
            .message_repo
            .created_since(now - Duration::days(CHART_DAYS as i64))
            .await?;

        Ok(StatsDto {
            groups_count,
            users_count,
            messages_count,
            total_chats_count,
            messages_chart: messages_chart(now, &recent),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtSettings;
    use crate::domain::{Chat, MockChatRepository, MockMessageRepository, MockUserRepository};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtSettings {
            secret: "test-secret-that-is-long-enough-for-hs256".into(),
            user_token_expiry_days: 15,
            admin_token_expiry_minutes: 30,
        })
    }

    fn service(
        users: MockUserRepository,
        chats: MockChatRepository,
        messages: MockMessageRepository,
    ) -> AdminServiceImpl<MockUserRepository, MockChatRepository, MockMessageRepository> {
        AdminServiceImpl::new(Arc::new(users), Arc::new(chats), Arc::new(messages), codec(), "s3cret")
    }

    #[test_case(0, 6 ; "just now lands in last slot")]
    #[test_case(23, 6 ; "same day")]
    #[test_case(25, 5 ; "yesterday")]
    #[test_case(24 * 6 + 1, 0 ; "six days ago")]
    fn test_messages_chart_slot(hours_ago: i64, slot: usize) {
        let now = Utc::now();
        let chart = messages_chart(now, &[now - Duration::hours(hours_ago)]);

        let mut expected = [0u32; CHART_DAYS];
        expected[slot] = 1;
        assert_eq!(chart, expected);
    }

    #[test]
    fn test_messages_chart_ignores_out_of_window() {
        let now = Utc::now();
        let chart = messages_chart(now, &[now - Duration::days(8), now + Duration::hours(1)]);
        assert_eq!(chart, [0; CHART_DAYS]);
    }

    #[test]
    fn test_verify_secret() {
        let svc = service(MockUserRepository::new(), MockChatRepository::new(), MockMessageRepository::new());

        assert!(matches!(svc.verify_secret("wrong"), Err(AdminError::InvalidSecret)));
        let token = svc.verify_secret("s3cret").unwrap();
        assert!(codec().verify_admin(&token).is_ok());
    }

    #[tokio::test]
    async fn test_all_users_counts_groups_and_friends() {
        let mut users = MockUserRepository::new();
        users.expect_list_all().returning(|| {
            Ok((1..=3)
                .map(|id| User {
                    id,
                    name: format!("u{id}"),
                    ..User::default()
                })
                .collect())
        });

        let mut chats = MockChatRepository::new();
        chats.expect_list_all().returning(|| {
            Ok(vec![
                Chat::new_group(10, "g", 1, &[2, 3]).unwrap(),
                Chat::new_direct(11, "d", 1, 2),
            ])
        });

        let svc = service(users, chats, MockMessageRepository::new());
        let listed = svc.all_users().await.unwrap();

        let one = listed.iter().find(|u| u.id == "1").unwrap();
        assert_eq!((one.groups, one.friends), (1, 1));
        let three = listed.iter().find(|u| u.id == "3").unwrap();
        assert_eq!((three.groups, three.friends), (1, 0));
    }

    #[tokio::test]
    async fn test_stats() {
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|| Ok(4));

        let mut chats = MockChatRepository::new();
        chats
            .expect_count()
            .withf(|f: &ChatFilter| f.group_chat == Some(true))
            .returning(|_| Ok(2));
        chats
            .expect_count()
            .withf(|f: &ChatFilter| f.group_chat.is_none())
            .returning(|_| Ok(5));

        let mut messages = MockMessageRepository::new();
        messages.expect_count_all().returning(|| Ok(9));
        messages
            .expect_created_since()
            .returning(|_| Ok(vec![Utc::now() - Duration::minutes(5)]));

        let stats = service(users, chats, messages).stats().await.unwrap();

        assert_eq!(stats.groups_count, 2);
        assert_eq!(stats.users_count, 4);
        assert_eq!(stats.messages_count, 9);
        assert_eq!(stats.total_chats_count, 5);
        assert_eq!(stats.messages_chart[CHART_DAYS - 1], 1);
    }
}
