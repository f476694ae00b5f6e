//! Friend request entity and repository trait.
//!
//! Maps to the `friend_requests` table. A request is pending for as long as
//! its row exists; answering it deletes the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A pending friend request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// User who sent the request
    pub sender_id: i64,

    /// User who may answer it
    pub receiver_id: i64,

    /// When the request was sent
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn new(id: i64, sender_id: i64, receiver_id: i64) -> Self {
        Self {
            id,
            sender_id,
            receiver_id,
            created_at: Utc::now(),
        }
    }

    /// Check whether `user_id` is the one allowed to answer.
    pub fn is_receiver(&self, user_id: i64) -> bool {
        self.receiver_id == user_id
    }
}

/// Repository trait for FriendRequest data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FriendRequestRepository: Send + Sync {
    /// Find a request between two users in either direction.
    async fn find_between(&self, a: i64, b: i64) -> Result<Option<FriendRequest>, AppError>;

    /// Find a request by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<FriendRequest>, AppError>;

    /// Insert a request.
    async fn create(&self, request: &FriendRequest) -> Result<FriendRequest, AppError>;

    /// Delete a request by ID.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Requests addressed to `user_id`, newest first.
    async fn find_by_receiver(&self, user_id: i64) -> Result<Vec<FriendRequest>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_receiver_may_answer() {
        let request = FriendRequest::new(1, 10, 20);
        assert!(request.is_receiver(20));
        assert!(!request.is_receiver(10));
    }
}
