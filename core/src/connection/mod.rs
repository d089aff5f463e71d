pub mod backoff;
pub mod clock;
pub mod manager;
pub mod memory;
pub mod state;
pub mod subscribers;
pub mod transport;
pub mod websocket;

pub use backoff::Backoff;
pub use clock::{Clock, TokioClock};
pub use manager::ConnectionManager;
pub use memory::{MemoryConnector, MemorySession, ScriptedFrame};
pub use state::{ConnectionState, ConnectionStatus, Diagnostic, Snapshot};
pub use subscribers::Subscription;
pub use transport::{Connector, Frame, Transport, TransportError};
pub use websocket::{WebSocketConnector, WebSocketTransport};
