use chrono::{DateTime, Utc};
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Initializing,
    Resolving { attempt: u32 },
    Connecting { attempt: u32, addr: SocketAddr },
    Identifying,
    Connected,
    Disconnected { reason: String },
}

/// One received line as seen by the application. `sender` and `channel` are
/// only filled in for chat messages (`PRIVMSG`).
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel: Option<String>,
    pub sender: Option<String>,
    pub text: String,
    pub raw: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_chat(&self) -> bool {
        self.sender.is_some()
    }
}
