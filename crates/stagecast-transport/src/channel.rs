//! The event channel.

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use stagecast_protocol::{Envelope, Notification, NotificationBus, TransportEvent};

use crate::connection::{ChannelConfig, ConnectionState};
use crate::connector::{Connector, LinkEvent, WireConnection};
use crate::dedup::RecentWindow;

/// A single reliable-looking event channel over an unreliable link.
///
/// Owns the connection state and the dedup window exclusively; every other
/// component talks to the channel through [`ChannelHandle::send`] and the
/// notifications it publishes on the bus.
pub struct EventChannel {
    config: ChannelConfig,
    state: Arc<RwLock<ConnectionState>>,
    outbound: Arc<RwLock<Option<Sender<String>>>>,
    window: RecentWindow,
    bus: NotificationBus,
    connector: Box<dyn Connector>,
    link: Option<WireConnection>,
}

impl EventChannel {
    pub fn new(config: ChannelConfig, bus: NotificationBus, connector: Box<dyn Connector>) -> Self {
        let window = RecentWindow::new(config.recent_window);
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            outbound: Arc::new(RwLock::new(None)),
            window,
            bus,
            connector,
            link: None,
        }
    }

    /// Connect to the coordination endpoint.
    ///
    /// No-op when already connected. A failed attempt emits
    /// `transport:error` on the bus instead of returning an error and does
    /// not retry; retry policy belongs to the caller.
    pub fn connect(&mut self) {
        if self.state.read().is_connected() {
            debug!("Already connected, ignoring connect request");
            return;
        }

        info!(
            endpoint = %self.config.endpoint_url(),
            "Connecting to coordination endpoint"
        );
        *self.state.write() = ConnectionState::Connecting;

        match self.connector.open(&self.config) {
            Ok(link) => {
                *self.outbound.write() = Some(link.outbound.clone());
                self.link = Some(link);
                *self.state.write() = ConnectionState::Connected;
                info!("Coordination link established");
                self.bus.publish(Notification::Transport(TransportEvent::Connect));
            }
            Err(e) => {
                warn!("Connection failed: {}", e);
                self.drop_link();
                self.bus.publish(Notification::Transport(TransportEvent::Error {
                    reason: e.to_string(),
                }));
            }
        }
    }

    /// Disconnect from the coordination endpoint.
    ///
    /// Idempotent: a second call is a no-op and emits nothing.
    pub fn disconnect(&mut self) {
        if self.state.read().is_disconnected() {
            debug!("Already disconnected, ignoring disconnect request");
            return;
        }

        info!("Disconnecting from coordination endpoint");
        self.drop_link();
        self.bus
            .publish(Notification::Transport(TransportEvent::Disconnected));
    }

    /// Fire-and-forget send. Logs and drops the message when not connected.
    pub fn send(&self, envelope: Envelope) {
        self.handle().send(envelope)
    }

    /// Drain everything the link has delivered since the last pump.
    ///
    /// Parses, dedups and dispatches inbound messages onto the bus, then
    /// folds any link failure or closure into the connection state.
    pub fn pump(&mut self) {
        let Some(link) = &self.link else {
            return;
        };

        while let Ok(raw) = link.inbound.try_recv() {
            let envelope = match Envelope::parse(&raw) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!("Dropping message without a valid action: {}", e);
                    continue;
                }
            };

            if let Some(id) = envelope.id.clone() {
                if !self.window.observe(&id) {
                    debug!(id = %id, action = %envelope.action, "Dropping duplicate message");
                    continue;
                }
            }

            debug!(action = %envelope.action, "Dispatching inbound message");
            self.bus.publish(Notification::Channel(envelope));
        }

        let mut failure: Option<Option<String>> = None;
        while let Ok(event) = link.link_events.try_recv() {
            match event {
                LinkEvent::Closed => failure = Some(None),
                LinkEvent::Error(reason) => failure = Some(Some(reason)),
            }
        }

        match failure {
            Some(Some(reason)) => {
                warn!("Coordination link failed: {}", reason);
                self.drop_link();
                self.bus
                    .publish(Notification::Transport(TransportEvent::Error { reason }));
            }
            Some(None) => {
                info!("Coordination link closed by the remote side");
                self.drop_link();
                self.bus
                    .publish(Notification::Transport(TransportEvent::Disconnected));
            }
            None => {}
        }
    }

    /// Cheap send-only handle for components that issue commands.
    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            state: Arc::clone(&self.state),
            outbound: Arc::clone(&self.outbound),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_connected()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn drop_link(&mut self) {
        *self.outbound.write() = None;
        self.link = None;
        *self.state.write() = ConnectionState::Disconnected;
    }
}

/// Send-only handle onto the event channel.
///
/// Holds no right to mutate the connection state or the dedup window.
#[derive(Clone)]
pub struct ChannelHandle {
    state: Arc<RwLock<ConnectionState>>,
    outbound: Arc<RwLock<Option<Sender<String>>>>,
}

impl ChannelHandle {
    /// Fire-and-forget send towards the remote endpoint.
    ///
    /// Fails silently (logs only) when not connected; callers that need
    /// delivery must check [`ChannelHandle::is_connected`] first.
    pub fn send(&self, envelope: Envelope) {
        if !self.state.read().is_connected() {
            warn!(action = %envelope.action, "Not connected, dropping outbound message");
            return;
        }

        let raw = match envelope.to_wire() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(action = %envelope.action, "Could not serialize message: {}", e);
                return;
            }
        };

        let outbound = self.outbound.read();
        match outbound.as_ref() {
            Some(tx) => {
                if tx.send(raw).is_err() {
                    warn!(action = %envelope.action, "Link gone, dropping outbound message");
                }
            }
            None => {
                warn!(action = %envelope.action, "No live link, dropping outbound message");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;
    use crate::TransportError;
    use crate::TransportResult;

    struct UnavailableConnector;

    impl Connector for UnavailableConnector {
        fn open(&mut self, _config: &ChannelConfig) -> TransportResult<WireConnection> {
            Err(TransportError::ConnectorUnavailable(
                "socket library missing".to_string(),
            ))
        }
    }

    fn config_with_window(window: usize) -> ChannelConfig {
        ChannelConfig {
            recent_window: window,
            auto_connect: false,
            ..ChannelConfig::default()
        }
    }

    fn drain(rx: &crossbeam_channel::Receiver<Notification>) -> Vec<Notification> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_connect_failure_emits_error_event() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let mut channel = EventChannel::new(
            config_with_window(10),
            bus,
            Box::new(UnavailableConnector),
        );

        channel.connect();

        assert_eq!(channel.state(), ConnectionState::Disconnected);
        let seen = drain(&events);
        assert!(matches!(
            seen.as_slice(),
            [Notification::Transport(TransportEvent::Error { .. })]
        ));
    }

    #[test]
    fn test_connect_is_noop_when_connected() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));

        channel.connect();
        channel.connect();

        // One link, one connect event.
        assert_eq!(peers.try_iter().count(), 1);
        let seen = drain(&events);
        assert_eq!(
            seen,
            vec![Notification::Transport(TransportEvent::Connect)]
        );
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let (connector, _peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));

        channel.connect();
        channel.disconnect();
        channel.disconnect();

        let disconnects = drain(&events)
            .into_iter()
            .filter(|n| matches!(n, Notification::Transport(TransportEvent::Disconnected)))
            .count();
        assert_eq!(disconnects, 1);
    }

    #[test]
    fn test_send_when_disconnected_drops_silently() {
        let bus = NotificationBus::new();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));

        channel.send(Envelope::new("start"));
        channel.connect();
        let peer = peers.recv().unwrap();

        channel.send(Envelope::new("stop"));
        let sent = peer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action, "stop");
    }

    #[test]
    fn test_outbound_order_preserved() {
        let bus = NotificationBus::new();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));
        channel.connect();
        let peer = peers.recv().unwrap();

        for action in ["set_quality", "set_fps", "set_gain"] {
            channel.send(Envelope::new(action));
        }

        let actions: Vec<String> = peer.sent().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["set_quality", "set_fps", "set_gain"]);
    }

    #[test]
    fn test_duplicate_message_dispatched_once() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));
        channel.connect();
        let peer = peers.recv().unwrap();

        let msg = Envelope::new("authorize").with_id("m-1").with("ok", true);
        peer.deliver(&msg);
        peer.deliver(&msg);
        channel.pump();

        let dispatched = drain(&events)
            .into_iter()
            .filter(|n| matches!(n, Notification::Channel(_)))
            .count();
        assert_eq!(dispatched, 1);
    }

    #[test]
    fn test_window_eviction_allows_redelivery() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(2), bus, Box::new(connector));
        channel.connect();
        let peer = peers.recv().unwrap();

        for id in ["a", "b", "c"] {
            peer.deliver(&Envelope::new("mic_activity").with_id(id));
        }
        channel.pump();
        // "a" was evicted, so a repeat dispatches again.
        peer.deliver(&Envelope::new("mic_activity").with_id("a"));
        peer.deliver(&Envelope::new("mic_activity").with_id("c"));
        channel.pump();

        let dispatched = drain(&events)
            .into_iter()
            .filter(|n| matches!(n, Notification::Channel(_)))
            .count();
        assert_eq!(dispatched, 4); // a, b, c, then a again; second c deduped
    }

    #[test]
    fn test_message_without_action_is_dropped() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));
        channel.connect();
        let peer = peers.recv().unwrap();

        peer.deliver_raw(r#"{"id":"1","value":80}"#);
        peer.deliver_raw("not json at all");
        channel.pump();

        assert!(drain(&events)
            .into_iter()
            .all(|n| !matches!(n, Notification::Channel(_))));
    }

    #[test]
    fn test_link_error_converges_to_disconnected() {
        let bus = NotificationBus::new();
        let events = bus.subscribe();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));
        channel.connect();
        let peer = peers.recv().unwrap();

        peer.fail("connection reset");
        channel.pump();

        assert_eq!(channel.state(), ConnectionState::Disconnected);
        assert!(drain(&events).iter().any(|n| matches!(
            n,
            Notification::Transport(TransportEvent::Error { .. })
        )));
    }

    #[test]
    fn test_reconnect_replaces_link() {
        let bus = NotificationBus::new();
        let (connector, peers) = MemoryConnector::new();
        let mut channel = EventChannel::new(config_with_window(10), bus, Box::new(connector));

        channel.connect();
        let first = peers.recv().unwrap();
        channel.disconnect();
        channel.connect();
        let second = peers.recv().unwrap();

        channel.send(Envelope::new("init"));
        assert!(first.sent().is_empty());
        assert_eq!(second.sent().len(), 1);
    }
}
