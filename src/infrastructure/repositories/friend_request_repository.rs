//! Friend Request Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{FriendRequest, FriendRequestRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct FriendRequestRow {
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    created_at: DateTime<Utc>,
}

impl From<FriendRequestRow> for FriendRequest {
    fn from(row: FriendRequestRow) -> Self {
        FriendRequest {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL friend request repository.
#[derive(Clone)]
pub struct PgFriendRequestRepository {
    pool: PgPool,
}

impl PgFriendRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendRequestRepository for PgFriendRequestRepository {
    async fn find_between(&self, a: i64, b: i64) -> Result<Option<FriendRequest>, AppError> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT id, sender_id, receiver_id, created_at
            FROM friend_requests
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            LIMIT 1
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FriendRequest>, AppError> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            "SELECT id, sender_id, receiver_id, created_at FROM friend_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, request: &FriendRequest) -> Result<FriendRequest, AppError> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            INSERT INTO friend_requests (id, sender_id, receiver_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, receiver_id, created_at
            "#,
        )
        .bind(request.id)
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM friend_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_receiver(&self, user_id: i64) -> Result<Vec<FriendRequest>, AppError> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT id, sender_id, receiver_id, created_at
            FROM friend_requests
            WHERE receiver_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
