//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use crate::shared::error::AppError;

/// Messages returned per history page.
pub const MESSAGES_PER_PAGE: i64 = 20;

/// Represents a message in a chat.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - chat_id: BIGINT NOT NULL (no FK; messages are bulk-deleted with the chat)
/// - content: TEXT NOT NULL DEFAULT ''
/// - attachments: JSONB NOT NULL DEFAULT '[]'
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Author user ID
    pub sender_id: i64,

    /// Chat the message belongs to
    pub chat_id: i64,

    /// Text content (empty for attachment-only messages)
    pub content: String,

    /// Stored files
    pub attachments: Vec<Attachment>,

    /// Timestamp when message was sent
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Check if this message carries files.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// Number of pages needed for `total` messages.
pub fn total_pages(total: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + MESSAGES_PER_PAGE - 1) / MESSAGES_PER_PAGE
    }
}

/// Row offset for a 1-based page number; pages below 1 are treated as 1.
///
/// Saturates instead of overflowing, so an absurd page reads past the end.
pub fn page_offset(page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(MESSAGES_PER_PAGE)
}

/// Repository trait for Message data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Newest-first slice of a chat's messages.
    async fn find_page(&self, chat_id: i64, offset: i64, limit: i64) -> Result<Vec<Message>, AppError>;

    /// Number of messages in a chat.
    async fn count_by_chat(&self, chat_id: i64) -> Result<i64, AppError>;

    /// Number of messages overall.
    async fn count_all(&self) -> Result<i64, AppError>;

    /// Every message, oldest first.
    async fn list_all(&self) -> Result<Vec<Message>, AppError>;

    /// Attachments of every message in a chat.
    async fn attachments_for_chat(&self, chat_id: i64) -> Result<Vec<Attachment>, AppError>;

    /// Delete all messages in a chat, returning how many were removed.
    async fn delete_by_chat(&self, chat_id: i64) -> Result<u64, AppError>;

    /// Creation timestamps of messages sent at or after `since`.
    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0 ; "empty chat")]
    #[test_case(1, 1 ; "single message")]
    #[test_case(20, 1 ; "exactly one page")]
    #[test_case(21, 2 ; "spills to second page")]
    #[test_case(45, 3 ; "partial last page")]
    fn test_total_pages(total: i64, expected: i64) {
        assert_eq!(total_pages(total), expected);
    }

    #[test_case(1, 0)]
    #[test_case(2, 20)]
    #[test_case(0, 0 ; "zero clamps to first page")]
    #[test_case(-3, 0 ; "negative clamps to first page")]
    fn test_page_offset(page: i64, expected: i64) {
        assert_eq!(page_offset(page), expected);
    }

    #[test_case(i64::MAX / 10 ; "tenth of max")]
    #[test_case(i64::MAX ; "max")]
    fn test_page_offset_saturates_for_huge_pages(page: i64) {
        assert_eq!(page_offset(page), i64::MAX);
    }

    #[test]
    fn test_has_attachments() {
        let mut message = Message {
            id: 1,
            sender_id: 2,
            chat_id: 3,
            content: "hi".into(),
            attachments: vec![],
            created_at: Utc::now(),
        };
        assert!(!message.has_attachments());

        message.attachments.push(Attachment {
            public_id: "a.png".into(),
            url: "http://localhost/media/a.png".into(),
        });
        assert!(message.has_attachments());
    }
}
