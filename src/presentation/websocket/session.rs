//! WebSocket Session State

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::application::services::SenderDto;

/// Per-socket state owned by the connection loop
#[derive(Debug)]
pub struct SocketSession {
    pub connection_id: Uuid,
    /// Authenticated user, as shown on relayed messages
    pub sender: SenderDto,
    last_seen: Instant,
}

impl SocketSession {
    pub fn new(connection_id: Uuid, sender: SenderDto) -> Self {
        Self {
            connection_id,
            sender,
            last_seen: Instant::now(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.sender.id
    }

    /// Record inbound traffic (any frame, including pongs).
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() >= timeout
    }
}
