use crate::protocol::{DataWindow, MalformedMessage};
use serde::Serialize;
use std::sync::Arc;

/// Lifecycle of a [`ConnectionManager`](crate::connection::ConnectionManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    ReconnectWait,
    /// Terminal.
    Stopped,
}

/// Mutable state owned by the manager's event loop. Outsiders only ever see
/// clones of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Most recently accepted window; survives reconnects.
    pub window: Option<Arc<DataWindow>>,
    pub reconnect_attempt: u32,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            window: None,
            reconnect_attempt: 0,
        }
    }
}

impl ConnectionState {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            connected: self.status == ConnectionStatus::Connected,
            station_id: self
                .window
                .as_ref()
                .map(|window| window.station_id().to_string()),
            window: self.window.clone(),
        }
    }
}

/// Read-only view handed to subscribers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub connected: bool,
    pub station_id: Option<String>,
    pub window: Option<Arc<DataWindow>>,
}

/// Non-fatal protocol fault observed on an otherwise healthy stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Malformed(MalformedMessage),
    Undecodable { reason: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Malformed(err) => write!(f, "{err}"),
            Diagnostic::Undecodable { reason } => write!(f, "undecodable frame: {reason}"),
        }
    }
}
