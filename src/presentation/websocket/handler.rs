//! WebSocket Connection Handler
//!
//! Upgrades authenticated requests and runs one loop per socket: a writer
//! task drains the outbound queue and pings; the reader dispatches client
//! events and enforces the idle timeout.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;

use super::directory::ConnectionHandle;
use super::gateway::Gateway;
use super::messages::ClientEvent;
use super::session::SocketSession;
use crate::application::services::{MessageError, MessageService, SenderDto};
use crate::domain::UserRepository;
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::PgUserRepository;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let user = PgUserRepository::new(state.db.clone())
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Please login to access this route".into()))?;
    let sender = SenderDto::from(&user);

    Ok(ws
        .max_message_size(state.settings.websocket.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, sender)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, sender: SenderDto) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Utf8Bytes>();
    let handle = ConnectionHandle::new(tx);
    let mut session = SocketSession::new(handle.id(), sender);
    let user_id = session.user_id();
    let connection_id = session.connection_id;

    state.gateway.connect(user_id, handle);
    metrics::socket_opened();

    let (mut sink, mut stream) = socket.split();
    let ping_every = Duration::from_secs(state.settings.websocket.ping_interval_secs.max(1));
    let idle_timeout = Duration::from_secs(state.settings.websocket.idle_timeout_secs);

    let writer = tokio::spawn(async move {
        let mut ping = interval(ping_every);
        ping.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sink.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    let message_service = state.message_service();
    let mut idle_check = interval(ping_every);
    idle_check.tick().await;

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        handle_event(text.as_str(), &session, &state.gateway, &message_service).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(user_id, connection_id = %connection_id, "Connection closed");
                        break;
                    }
                    Some(Ok(_)) => session.touch(),
                    Some(Err(e)) => {
                        tracing::debug!(user_id, connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = idle_check.tick() => {
                if session.is_idle(idle_timeout) {
                    tracing::info!(user_id, connection_id = %connection_id, "Idle timeout, closing connection");
                    break;
                }
            }
        }
    }

    state.gateway.disconnect(user_id, connection_id);
    metrics::socket_closed();
    writer.abort();
}

/// Dispatch one client frame. Malformed frames are logged and dropped.
async fn handle_event<S: MessageService + ?Sized>(
    text: &str,
    session: &SocketSession,
    gateway: &Gateway,
    message_service: &S,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                connection_id = %session.connection_id,
                error = %e,
                "Ignoring malformed frame"
            );
            return;
        }
    };

    match event {
        ClientEvent::NewMessage(payload) => {
            let result = message_service
                .relay_message(&session.sender, payload.chat_id, &payload.members, payload.message)
                .await;
            match result {
                Ok(_) => {}
                Err(MessageError::NotPersisted { .. }) => metrics::record_persist_failure(),
                Err(e) => tracing::warn!(
                    user_id = session.user_id(),
                    chat_id = payload.chat_id,
                    error = %e,
                    "Message relay failed"
                ),
            }
        }
        ClientEvent::StartTyping(payload) => {
            gateway.relay_typing(session.connection_id, payload.chat_id, &payload.members, true);
        }
        ClientEvent::StopTyping(payload) => {
            gateway.relay_typing(session.connection_id, payload.chat_id, &payload.members, false);
        }
        ClientEvent::ChatJoined(payload) => {
            gateway.relay_presence(session.user_id(), &payload.members, true);
        }
        ClientEvent::ChatLeaved(payload) => {
            gateway.relay_presence(session.user_id(), &payload.members, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{MessageDto, MessagePageDto};
    use crate::domain::UploadedFile;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    /// Records relayed messages; optionally fails them as unstored.
    #[derive(Default)]
    struct StubMessages {
        relayed: Mutex<Vec<(SenderDto, i64, Vec<i64>, String)>>,
        fail_persist: bool,
    }

    #[async_trait::async_trait]
    impl MessageService for StubMessages {
        async fn relay_message(
            &self,
            sender: &SenderDto,
            chat_id: i64,
            members: &[i64],
            content: String,
        ) -> Result<MessageDto, MessageError> {
            self.relayed
                .lock()
                .push((sender.clone(), chat_id, members.to_vec(), content.clone()));
            if self.fail_persist {
                return Err(MessageError::NotPersisted {
                    message_id: 1,
                    source: AppError::Internal("insert failed".into()),
                });
            }
            Ok(MessageDto {
                id: "1".into(),
                content,
                attachments: vec![],
                sender: sender.clone(),
                chat_id: chat_id.to_string(),
                created_at: "2024-01-01T00:00:00Z".into(),
            })
        }

        async fn send_attachments(
            &self,
            _user_id: i64,
            _chat_id: i64,
            _files: Vec<UploadedFile>,
        ) -> Result<MessageDto, MessageError> {
            unreachable!("not dispatched from the socket")
        }

        async fn get_messages(&self, _user_id: i64, _chat_id: i64, _page: i64) -> Result<MessagePageDto, MessageError> {
            unreachable!("not dispatched from the socket")
        }
    }

    struct Client {
        handle: ConnectionHandle,
        rx: mpsc::UnboundedReceiver<Utf8Bytes>,
    }

    impl Client {
        fn connect(gateway: &Gateway, user_id: i64) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            let handle = ConnectionHandle::new(tx);
            gateway.connect(user_id, handle.clone());
            Self { handle, rx }
        }

        fn session(&self, user_id: i64) -> SocketSession {
            SocketSession::new(
                self.handle.id(),
                SenderDto {
                    id: user_id,
                    name: format!("user{user_id}"),
                },
            )
        }

        fn frames(&mut self) -> Vec<Value> {
            let mut out = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                out.push(serde_json::from_str(frame.as_str()).unwrap());
            }
            out
        }
    }

    #[tokio::test]
    async fn test_new_message_relayed_as_session_user() {
        let gateway = Gateway::new();
        let alice = Client::connect(&gateway, 1);
        let messages = StubMessages::default();

        let frame = json!({
            "event": "new-message",
            "data": { "chatId": "9", "members": ["1", "2"], "message": "hi" }
        });
        handle_event(&frame.to_string(), &alice.session(1), &gateway, &messages).await;

        let relayed = messages.relayed.lock();
        assert_eq!(relayed.len(), 1);
        let (sender, chat_id, members, content) = &relayed[0];
        assert_eq!(sender.id, 1);
        assert_eq!(*chat_id, 9);
        assert_eq!(members, &vec![1, 2]);
        assert_eq!(content, "hi");
    }

    #[tokio::test]
    async fn test_unstored_message_counts_persist_failure() {
        let gateway = Gateway::new();
        let alice = Client::connect(&gateway, 1);
        let messages = StubMessages {
            fail_persist: true,
            ..Default::default()
        };
        let before = metrics::MESSAGE_PERSIST_FAILURES_TOTAL.get();

        let frame = json!({
            "event": "new-message",
            "data": { "chatId": "9", "members": ["1"], "message": "lost" }
        });
        handle_event(&frame.to_string(), &alice.session(1), &gateway, &messages).await;

        assert!(metrics::MESSAGE_PERSIST_FAILURES_TOTAL.get() > before);
    }

    #[tokio::test]
    async fn test_presence_uses_session_user_not_payload() {
        let gateway = Gateway::new();
        let alice = Client::connect(&gateway, 1);
        let mut bob = Client::connect(&gateway, 2);
        let messages = StubMessages::default();

        let joined = json!({
            "event": "chat-joined",
            "data": { "userId": "777", "members": ["1", "2"] }
        });
        handle_event(&joined.to_string(), &alice.session(1), &gateway, &messages).await;

        assert!(gateway.directory().is_online(1));
        assert!(!gateway.directory().is_online(777));
        assert_eq!(
            bob.frames(),
            vec![json!({ "event": "online-users", "data": ["1"] })]
        );

        let leaved = json!({
            "event": "chat-leaved",
            "data": { "userId": "777", "members": ["2"] }
        });
        handle_event(&leaved.to_string(), &alice.session(1), &gateway, &messages).await;

        assert!(!gateway.directory().is_online(1));
        assert_eq!(
            bob.frames(),
            vec![json!({ "event": "online-users", "data": [] })]
        );
    }

    #[tokio::test]
    async fn test_typing_skips_own_connection() {
        let gateway = Gateway::new();
        let mut alice = Client::connect(&gateway, 1);
        let mut bob = Client::connect(&gateway, 2);
        let messages = StubMessages::default();

        let frame = json!({ "event": "typing-start", "data": { "chatId": "9", "members": ["1", "2"] } });
        handle_event(&frame.to_string(), &alice.session(1), &gateway, &messages).await;

        assert!(alice.frames().is_empty());
        assert_eq!(
            bob.frames(),
            vec![json!({ "event": "typing-start", "data": { "chat_id": "9" } })]
        );
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let gateway = Gateway::new();
        let alice = Client::connect(&gateway, 1);
        let mut bob = Client::connect(&gateway, 2);
        let messages = StubMessages::default();
        let session = alice.session(1);

        for frame in ["not json", r#"{"event": "unknown", "data": {}}"#, r#"{"event": "new-message"}"#] {
            handle_event(frame, &session, &gateway, &messages).await;
        }

        assert!(messages.relayed.lock().is_empty());
        assert!(bob.frames().is_empty());
        assert!(gateway.directory().is_current(1, session.connection_id));

        let frame = json!({
            "event": "new-message",
            "data": { "chatId": "9", "members": ["2"], "message": "still here" }
        });
        handle_event(&frame.to_string(), &session, &gateway, &messages).await;
        assert_eq!(messages.relayed.lock().len(), 1);
    }
}
