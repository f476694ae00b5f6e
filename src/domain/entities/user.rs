//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use crate::shared::error::AppError;

/// Represents a user account in the chat system.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(64) NOT NULL
/// - username: VARCHAR(32) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL
/// - bio: TEXT NOT NULL
/// - avatar_public_id: TEXT NOT NULL
/// - avatar_url: TEXT NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Display name shown to other users
    pub name: String,

    /// Login name (unique)
    pub username: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Profile text
    pub bio: String,

    /// Uploaded avatar image
    pub avatar: Attachment,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            username: String::new(),
            password_hash: String::new(),
            bio: String::new(),
            avatar: Attachment::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual database interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find every user whose ID is in `ids`. Unknown IDs are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;

    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Create a new user in the database.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Case-insensitive substring search on display name, skipping `exclude`.
    async fn search_by_name(&self, name: &str, exclude: &[i64]) -> Result<Vec<User>, AppError>;

    /// All users, oldest first.
    async fn list_all(&self) -> Result<Vec<User>, AppError>;

    /// Total number of users.
    async fn count(&self) -> Result<i64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        User {
            id: 12345678901234567,
            name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            password_hash: "hashed_password".to_string(),
            bio: "first programmer".to_string(),
            avatar: Attachment {
                public_id: "avatar-1.png".to_string(),
                url: "http://localhost:3000/media/avatar-1.png".to_string(),
            },
            ..User::default()
        }
    }

    #[test]
    fn test_user_default() {
        let user = User::default();

        assert_eq!(user.id, 0);
        assert!(user.name.is_empty());
        assert!(user.username.is_empty());
        assert!(user.avatar.url.is_empty());
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = create_test_user();

        let serialized = serde_json::to_string(&user).expect("Failed to serialize user");

        assert!(!serialized.contains("password_hash"));
        assert!(!serialized.contains("hashed_password"));
    }

    #[test]
    fn test_user_serialization_includes_avatar() {
        let user = create_test_user();

        let serialized = serde_json::to_string(&user).expect("Failed to serialize user");

        assert!(serialized.contains("\"username\":\"ada\""));
        assert!(serialized.contains("\"public_id\":\"avatar-1.png\""));
    }
}
