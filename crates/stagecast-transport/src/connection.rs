//! Connection state and channel configuration.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CHANNEL, DEFAULT_PORT, DEFAULT_RECENT_WINDOW};

/// State of the logical connection to the coordination endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,

    /// Connection attempt in flight.
    Connecting,

    /// Link established.
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_disconnected(self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        }
    }
}

/// Configuration for connecting the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Hostname of the coordination endpoint.
    pub host: String,

    /// Port of the coordination endpoint.
    pub port: u16,

    /// Transmission channel name.
    pub channel: String,

    /// Connect as soon as the channel is created.
    pub auto_connect: bool,

    /// Capacity of the recent-message dedup window.
    pub recent_window: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            channel: DEFAULT_CHANNEL.to_string(),
            auto_connect: true,
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }
}

impl ChannelConfig {
    /// WebSocket URL of the coordination endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("ws://{}:{}/{}", self.host, self.port, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.port, 1337);
        assert_eq!(config.channel, "event-channel");
        assert_eq!(config.recent_window, 10);
        assert!(config.auto_connect);
    }

    #[test]
    fn test_endpoint_url() {
        let config = ChannelConfig {
            host: "media.example".into(),
            port: 9000,
            channel: "stage".into(),
            ..ChannelConfig::default()
        };
        assert_eq!(config.endpoint_url(), "ws://media.example:9000/stage");
    }
}
