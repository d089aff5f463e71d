use async_trait::async_trait;

/// Transport-level faults. All of them are recovered by reconnecting.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Inbound frame delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Frame that arrived intact but could not be read as text.
    Undecodable(String),
}

/// An open duplex connection to the feed.
#[async_trait]
pub trait Transport: Send {
    /// Waits for the next inbound frame. `None` means the peer closed.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;

    async fn close(&mut self);
}

/// Factory opening a fresh transport for every connect cycle.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}
