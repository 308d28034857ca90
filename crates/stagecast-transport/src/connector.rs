//! The seam between the event channel and the underlying link.

use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::Runtime;

use crate::connection::ChannelConfig;
use crate::TransportResult;

/// Out-of-band events reported by the link driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The remote side closed the link.
    Closed,

    /// The link failed.
    Error(String),
}

/// One live underlying link.
///
/// Wire traffic is JSON text in both directions; outbound order is
/// preserved by the single FIFO channel.
pub struct WireConnection {
    /// Outbound wire text towards the endpoint.
    pub outbound: Sender<String>,

    /// Inbound wire text from the endpoint.
    pub inbound: Receiver<String>,

    /// Link lifecycle events (closure, failure).
    pub link_events: Receiver<LinkEvent>,

    // Keeps the async driver alive for the lifetime of the link; dropped
    // together with the connection on disconnect/replace.
    runtime: Option<Runtime>,
}

impl WireConnection {
    /// A link bridged over plain channels (in-process connectors).
    pub fn new(
        outbound: Sender<String>,
        inbound: Receiver<String>,
        link_events: Receiver<LinkEvent>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            link_events,
            runtime: None,
        }
    }

    /// A link whose driver tasks live on a private runtime.
    pub fn with_runtime(
        outbound: Sender<String>,
        inbound: Receiver<String>,
        link_events: Receiver<LinkEvent>,
        runtime: Runtime,
    ) -> Self {
        Self {
            outbound,
            inbound,
            link_events,
            runtime: Some(runtime),
        }
    }
}

impl Drop for WireConnection {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(std::time::Duration::from_secs(5));
        }
    }
}

/// Opens underlying links for the event channel.
///
/// The channel opens at most one link at a time; a reconnect calls `open`
/// again and replaces the previous [`WireConnection`] atomically.
pub trait Connector: Send {
    fn open(&mut self, config: &ChannelConfig) -> TransportResult<WireConnection>;
}
