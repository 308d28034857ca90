//! Shared process context: one event channel, one notification bus.

use tracing::info;

use stagecast_protocol::NotificationBus;
use stagecast_transport::{ChannelConfig, Connector, EventChannel};

/// Process-wide plumbing shared by every broadcaster session.
///
/// All sessions speak through the same event channel and publish to the
/// same bus; the context owns both.
pub struct AppContext {
    bus: NotificationBus,
    channel: EventChannel,
}

impl AppContext {
    /// Build the context, connecting the channel when the config asks
    /// for it. A failed initial connect surfaces on the bus as a
    /// transport error, not here.
    pub fn new(config: ChannelConfig, connector: Box<dyn Connector>) -> Self {
        let bus = NotificationBus::default();
        let auto_connect = config.auto_connect;
        let mut channel = EventChannel::new(config, bus.clone(), connector);

        if auto_connect {
            info!("Connecting event channel on startup");
            channel.connect();
        }

        Self { bus, channel }
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut EventChannel {
        &mut self.channel
    }
}
