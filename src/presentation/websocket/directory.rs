//! Connection Directory
//!
//! Maps user IDs to their live socket and tracks the presence set.
//! One connection per user: a new registration replaces the old handle.

use std::collections::HashSet;

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sending half of a socket's outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    sender: mpsc::UnboundedSender<Utf8Bytes>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<Utf8Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a frame. A closed socket drops it silently.
    pub fn send(&self, frame: Utf8Bytes) {
        let _ = self.sender.send(frame);
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// Process-local registry of live connections and online users.
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    connections: DashMap<i64, ConnectionHandle>,
    online: DashMap<i64, ()>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handle` for `user_id`, returning the handle it replaced.
    pub fn register(&self, user_id: i64, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.connections.insert(user_id, handle)
    }

    /// Handles for every listed user that is connected, in input order.
    /// Repeated IDs resolve once.
    pub fn resolve(&self, user_ids: &[i64]) -> Vec<ConnectionHandle> {
        let mut seen = HashSet::with_capacity(user_ids.len());
        user_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.connections.get(id).map(|h| h.value().clone()))
            .collect()
    }

    pub fn mark_online(&self, user_id: i64) {
        self.online.insert(user_id, ());
    }

    pub fn mark_offline(&self, user_id: i64) {
        self.online.remove(&user_id);
    }

    /// Drop the user's connection and presence.
    pub fn unregister(&self, user_id: i64) {
        self.connections.remove(&user_id);
        self.online.remove(&user_id);
    }

    /// Drop the user's connection only if `connection_id` is still the
    /// registered one. Returns whether anything was removed.
    pub fn unregister_if_current(&self, user_id: i64, connection_id: Uuid) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, handle| handle.id == connection_id)
            .is_some();
        if removed {
            self.online.remove(&user_id);
        }
        removed
    }

    pub fn is_current(&self, user_id: i64, connection_id: Uuid) -> bool {
        self.connections
            .get(&user_id)
            .map(|h| h.id == connection_id)
            .unwrap_or(false)
    }

    pub fn is_online(&self, user_id: i64) -> bool {
        self.online.contains_key(&user_id)
    }

    /// Sorted snapshot of the presence set.
    pub fn online_users(&self) -> Vec<i64> {
        let mut users: Vec<i64> = self.online.iter().map(|e| *e.key()).collect();
        users.sort_unstable();
        users
    }

    pub fn all_handles(&self) -> Vec<ConnectionHandle> {
        self.connections.iter().map(|e| e.value().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
