//! Real-time Events
//!
//! Event names shared with clients and the port services use to push events
//! to connected users. The WebSocket gateway is the production publisher.

use serde_json::Value;

pub const NEW_MESSAGE: &str = "new-message";
pub const NEW_MESSAGE_ALERT: &str = "new-message-alert";
pub const START_TYPING: &str = "typing-start";
pub const STOP_TYPING: &str = "typing-stop";
pub const CHAT_JOINED: &str = "chat-joined";
pub const CHAT_LEAVED: &str = "chat-leaved";
pub const ONLINE_USERS: &str = "online-users";
pub const ALERT: &str = "alert";
pub const REFETCH_CHATS: &str = "refetch-chats";
pub const NEW_REQUEST: &str = "new-request";

/// Delivers a named event to whichever of `users` are currently connected.
///
/// Delivery is fire-and-forget: offline users are skipped and nothing is
/// reported back to the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &str, users: &[i64], payload: Value);
}

#[cfg(test)]
pub use recording::{PublishedEvent, RecordingPublisher};
