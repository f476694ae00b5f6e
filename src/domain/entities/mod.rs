//! # Domain Entities
//!
//! Core domain entities representing the main business objects in the chat server.
//!
//! - **User**: account with credentials and profile
//! - **Chat**: direct or group conversation and its membership rules
//! - **Message**: text and/or attachments sent to a chat
//! - **FriendRequest**: pending request that becomes a direct chat when accepted
//! - **Attachment**: stored file reference, plus the media store contract
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod attachment;
mod chat;
mod friend_request;
mod message;
mod user;

pub use attachment::{Attachment, MediaStore, UploadedFile, MAX_ATTACHMENTS_PER_MESSAGE};
pub use chat::{
    Chat, ChatFilter, ChatRepository, MembershipError, MAX_GROUP_MEMBERS, MIN_GROUP_MEMBERS,
    MIN_INVITED_MEMBERS,
};
pub use friend_request::{FriendRequest, FriendRequestRepository};
pub use message::{page_offset, total_pages, Message, MessageRepository, MESSAGES_PER_PAGE};
pub use user::{User, UserRepository};

#[cfg(test)]
pub use attachment::MockMediaStore;
#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use friend_request::MockFriendRequestRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;
