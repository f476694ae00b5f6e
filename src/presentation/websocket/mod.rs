//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod directory;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use directory::{ConnectionDirectory, ConnectionHandle};
pub use gateway::Gateway;
pub use handler::ws_handler;
pub use messages::{ClientEvent, Envelope};
pub use session::SocketSession;
