//! Resilient streaming client for live seismic telemetry feeds.
//!
//! A [`ConnectionManager`] keeps one WebSocket subscription alive, decodes
//! every inbound frame into a [`DataWindow`](protocol::DataWindow) and hands
//! immutable [`Snapshot`]s of the latest state to its listeners.

pub mod connection;
pub mod prelude;
pub mod protocol;
pub mod telemetry;

pub use connection::{ConnectionManager, Snapshot, Subscription};
pub use prelude::{FeedConfig, FeedError, FeedResult, ReconnectPolicy};
