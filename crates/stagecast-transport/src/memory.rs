//! In-process loopback connector.
//!
//! Bridges the event channel to plain channel pairs so the protocol can be
//! exercised deterministically in tests, or wired to an in-process
//! coordination endpoint.

use crossbeam_channel::{Receiver, Sender};

use stagecast_protocol::Envelope;

use crate::connection::ChannelConfig;
use crate::connector::{Connector, LinkEvent, WireConnection};
use crate::TransportResult;

/// Connector that hands the remote side of every opened link to the
/// receiver returned by [`MemoryConnector::new`].
pub struct MemoryConnector {
    peer_tx: Sender<MemoryPeer>,
}

impl MemoryConnector {
    pub fn new() -> (Self, Receiver<MemoryPeer>) {
        let (peer_tx, peer_rx) = crossbeam_channel::unbounded();
        (Self { peer_tx }, peer_rx)
    }
}

impl Connector for MemoryConnector {
    fn open(&mut self, _config: &ChannelConfig) -> TransportResult<WireConnection> {
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        let (in_tx, in_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let peer = MemoryPeer {
            to_client: in_tx,
            from_client: out_rx,
            link_events: event_tx,
        };
        // The test may not care about the peer; ignore a dropped receiver.
        let _ = self.peer_tx.send(peer);

        Ok(WireConnection::new(out_tx, in_rx, event_rx))
    }
}

/// The remote side of an in-process link.
pub struct MemoryPeer {
    to_client: Sender<String>,
    from_client: Receiver<String>,
    link_events: Sender<LinkEvent>,
}

impl MemoryPeer {
    /// Deliver a message to the client side.
    pub fn deliver(&self, envelope: &Envelope) {
        let raw = envelope.to_wire().expect("envelope serializes");
        self.deliver_raw(&raw);
    }

    /// Deliver raw wire text, valid or not.
    pub fn deliver_raw(&self, raw: &str) {
        let _ = self.to_client.send(raw.to_string());
    }

    /// Drain and parse everything the client sent.
    pub fn sent(&self) -> Vec<Envelope> {
        self.from_client
            .try_iter()
            .filter_map(|raw| Envelope::parse(&raw).ok())
            .collect()
    }

    /// Report a link failure to the client side.
    pub fn fail(&self, reason: &str) {
        let _ = self.link_events.send(LinkEvent::Error(reason.to_string()));
    }

    /// Report a remote closure to the client side.
    pub fn close(&self) {
        let _ = self.link_events.send(LinkEvent::Closed);
    }
}
