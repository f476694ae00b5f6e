//! Message Repository Implementation
//!
//! PostgreSQL implementation of message storage with offset pagination.
//! Attachments live inline in a JSONB column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{Attachment, Message, MessageRepository};
use crate::shared::error::AppError;

const MESSAGE_COLUMNS: &str = "id, sender_id, chat_id, content, attachments, created_at";

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    sender_id: i64,
    chat_id: i64,
    content: String,
    attachments: Json<Vec<Attachment>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            chat_id: self.chat_id,
            content: self.content,
            attachments: self.attachments.0,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, sender_id, chat_id, content, attachments, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.chat_id)
        .bind(&message.content)
        .bind(Json(&message.attachments))
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }

    async fn find_page(&self, chat_id: i64, offset: i64, limit: i64) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn count_by_chat(&self, chat_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn attachments_for_chat(&self, chat_id: i64) -> Result<Vec<Attachment>, AppError> {
        let rows: Vec<Json<Vec<Attachment>>> = sqlx::query_scalar(
            "SELECT attachments FROM messages WHERE chat_id = $1 AND attachments <> '[]'::jsonb",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().flat_map(|json| json.0).collect())
    }

    async fn delete_by_chat(&self, chat_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AppError> {
        let stamps: Vec<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM messages WHERE created_at >= $1")
                .bind(since)
                .fetch_all(&self.pool)
                .await?;
        Ok(stamps)
    }
}
