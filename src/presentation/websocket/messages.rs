//! WebSocket Message Types
//!
//! Every frame in either direction is `{ "event": <name>, "data": <json> }`.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::snowflake::{id_string, id_string_vec};

/// Outgoing frame
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    pub event: &'a str,
    pub data: &'a Value,
}

impl<'a> Envelope<'a> {
    pub fn new(event: &'a str, data: &'a Value) -> Self {
        Self { event, data }
    }

    /// Serialize once for fan-out; the result is cheap to clone.
    pub fn to_frame(&self) -> Result<Utf8Bytes, serde_json::Error> {
        serde_json::to_string(self).map(Utf8Bytes::from)
    }
}

/// Incoming frame
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "new-message")]
    NewMessage(NewMessagePayload),

    #[serde(rename = "typing-start")]
    StartTyping(TypingPayload),

    #[serde(rename = "typing-stop")]
    StopTyping(TypingPayload),

    #[serde(rename = "chat-joined")]
    ChatJoined(PresencePayload),

    #[serde(rename = "chat-leaved")]
    ChatLeaved(PresencePayload),
}

/// Text message to relay to `members` and store in `chat_id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    #[serde(with = "id_string", alias = "chat_id")]
    pub chat_id: i64,

    #[serde(with = "id_string_vec")]
    pub members: Vec<i64>,

    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(with = "id_string", alias = "chat_id")]
    pub chat_id: i64,

    #[serde(with = "id_string_vec")]
    pub members: Vec<i64>,
}

/// Presence change scoped to `members`. A client-sent user id is ignored;
/// the authenticated user is always the subject.
#[derive(Debug, Deserialize)]
pub struct PresencePayload {
    #[serde(with = "id_string_vec")]
    pub members: Vec<i64>,
}
