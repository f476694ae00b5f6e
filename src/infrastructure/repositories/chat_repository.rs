//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait.
//! Membership is stored as a `BIGINT[]` column backed by a GIN index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Chat, ChatFilter, ChatRepository};
use crate::shared::error::AppError;

const CHAT_COLUMNS: &str = "id, name, group_chat, creator_id, members, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: i64,
    name: String,
    group_chat: bool,
    creator_id: Option<i64>,
    members: Vec<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRow {
    fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            name: self.name,
            group_chat: self.group_chat,
            creator_id: self.creator_id,
            members: self.members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    /// Create a new PgChatRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, predicate: &str, user_id: i64) -> Result<Vec<Chat>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE {predicate} ORDER BY updated_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatRow::into_chat).collect())
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ChatRow::into_chat))
    }

    async fn create(&self, chat: &Chat) -> Result<Chat, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            INSERT INTO chats (id, name, group_chat, creator_id, members, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.group_chat)
        .bind(chat.creator_id)
        .bind(&chat.members)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_chat())
    }

    async fn update(&self, chat: &Chat) -> Result<Chat, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            UPDATE chats
            SET name = $2, creator_id = $3, members = $4, updated_at = $5
            WHERE id = $1
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.creator_id)
        .bind(&chat.members)
        .bind(chat.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".into()))?;

        Ok(row.into_chat())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_member(&self, user_id: i64) -> Result<Vec<Chat>, AppError> {
        self.fetch_where("$1 = ANY(members)", user_id).await
    }

    async fn find_direct_by_member(&self, user_id: i64) -> Result<Vec<Chat>, AppError> {
        self.fetch_where("group_chat = FALSE AND $1 = ANY(members)", user_id)
            .await
    }

    async fn find_by_creator(&self, user_id: i64) -> Result<Vec<Chat>, AppError> {
        self.fetch_where("group_chat = TRUE AND creator_id = $1", user_id)
            .await
    }

    async fn list_all(&self) -> Result<Vec<Chat>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatRow::into_chat).collect())
    }

    async fn count(&self, filter: ChatFilter) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chats
            WHERE ($1::BOOLEAN IS NULL OR group_chat = $1)
              AND ($2::BIGINT IS NULL OR $2 = ANY(members))
            "#,
        )
        .bind(filter.group_chat)
        .bind(filter.member)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
