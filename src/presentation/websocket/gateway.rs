//! WebSocket Gateway
//!
//! Fan-out of named events to connected users. Services reach it through
//! the [`EventPublisher`] port; the socket loop calls the typing and
//! presence relays directly.

use serde_json::{json, Value};
use uuid::Uuid;

use super::directory::{ConnectionDirectory, ConnectionHandle};
use super::messages::Envelope;
use crate::application::events::{EventPublisher, ONLINE_USERS, START_TYPING, STOP_TYPING};
use crate::infrastructure::metrics;

/// Process-scoped real-time gateway
#[derive(Debug, Default)]
pub struct Gateway {
    directory: ConnectionDirectory,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&self) -> &ConnectionDirectory {
        &self.directory
    }

    /// Register a freshly opened socket for `user_id`.
    pub fn connect(&self, user_id: i64, handle: ConnectionHandle) {
        let connection_id = handle.id();
        if let Some(previous) = self.directory.register(user_id, handle) {
            tracing::debug!(
                user_id,
                connection_id = %connection_id,
                replaced = %previous.id(),
                "Connection replaced"
            );
        }
        tracing::info!(user_id, connection_id = %connection_id, "Connection registered");
    }

    fn deliver(&self, event: &str, payload: &Value, targets: &[ConnectionHandle]) -> usize {
        metrics::record_event(event);

        if targets.is_empty() {
            return 0;
        }
        let frame = match Envelope::new(event, payload).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(event, error = %e, "Failed to serialize event");
                return 0;
            }
        };
        for handle in targets {
            handle.send(frame.clone());
        }
        targets.len()
    }

    /// Send `event` to whichever of `users` are connected. Returns the
    /// number of connections reached.
    pub fn emit(&self, event: &str, users: &[i64], payload: Value) -> usize {
        let targets = self.directory.resolve(users);
        self.deliver(event, &payload, &targets)
    }

    /// Typing indicator to the chat's members, skipping the typist's own socket.
    pub fn relay_typing(&self, sender_connection: Uuid, chat_id: i64, members: &[i64], started: bool) {
        let event = if started { START_TYPING } else { STOP_TYPING };
        let targets: Vec<ConnectionHandle> = self
            .directory
            .resolve(members)
            .into_iter()
            .filter(|h| h.id() != sender_connection)
            .collect();

        self.deliver(event, &json!({ "chat_id": chat_id.to_string() }), &targets);
    }

    /// Update presence for `user_id` and send the full online set to `members`.
    pub fn relay_presence(&self, user_id: i64, members: &[i64], joined: bool) {
        if joined {
            self.directory.mark_online(user_id);
        } else {
            self.directory.mark_offline(user_id);
        }
        let online = self.online_payload();
        self.emit(ONLINE_USERS, members, online);
    }

    /// Tear down a closed socket and tell everyone still connected.
    ///
    /// A socket that was already replaced by a newer one leaves state untouched.
    pub fn disconnect(&self, user_id: i64, connection_id: Uuid) -> bool {
        if !self.directory.unregister_if_current(user_id, connection_id) {
            tracing::debug!(user_id, connection_id = %connection_id, "Stale connection closed");
            return false;
        }

        let online = self.online_payload();
        let everyone = self.directory.all_handles();
        self.deliver(ONLINE_USERS, &online, &everyone);

        tracing::info!(user_id, connection_id = %connection_id, "Connection unregistered");
        true
    }

    fn online_payload(&self) -> Value {
        let online = self.directory.online_users();
        metrics::set_online_users(online.len());
        Value::from(online.iter().map(|id| id.to_string()).collect::<Vec<_>>())
    }
}

impl EventPublisher for Gateway {
    fn publish(&self, event: &str, users: &[i64], payload: Value) {
        let reached = self.emit(event, users, payload);
        tracing::debug!(event, targets = users.len(), reached, "Event published");
    }
}
