//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Accounts and name search
//! - **ChatRepository** - Direct chats and groups with array membership
//! - **MessageRepository** - Messages with inline attachments
//! - **FriendRequestRepository** - Pending friend requests
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use chatline::infrastructure::repositories::{PgChatRepository, PgUserRepository};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let chat_repo = PgChatRepository::new(pool);
//! }
//! ```

pub mod chat_repository;
pub mod friend_request_repository;
pub mod message_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use friend_request_repository::PgFriendRequestRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
