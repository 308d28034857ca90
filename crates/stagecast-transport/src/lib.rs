//! Event channel to the remote coordination endpoint.
//!
//! This crate keeps a single logical connection alive over an unreliable
//! underlying link, suppresses duplicate deliveries and dispatches inbound
//! messages onto the notification bus. Reconnect policy is deliberately the
//! caller's responsibility: a failed connect emits `transport:error` and
//! stops there.

mod channel;
mod connection;
mod connector;
mod dedup;
mod error;
pub mod memory;
mod ws;

pub use channel::{ChannelHandle, EventChannel};
pub use connection::{ChannelConfig, ConnectionState};
pub use connector::{Connector, LinkEvent, WireConnection};
pub use dedup::RecentWindow;
pub use error::TransportError;
pub use ws::WsConnector;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Default capacity of the recent-message dedup window.
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Default coordination endpoint port.
pub const DEFAULT_PORT: u16 = 1337;

/// Default transmission channel name.
pub const DEFAULT_CHANNEL: &str = "event-channel";
