//! Error types for the transport layer.

use thiserror::Error;

/// Errors that can occur while operating the event channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying connection library or driver is unavailable.
    #[error("Connector unavailable: {0}")]
    ConnectorUnavailable(String),

    /// The endpoint URL is malformed.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// The connection attempt failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation requires a live connection.
    #[error("Not connected")]
    NotConnected,

    /// The underlying link closed underneath us.
    #[error("Link closed")]
    LinkClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
