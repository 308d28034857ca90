//! Process-wide notification bus.
//!
//! Multi-producer, multi-consumer publish/subscribe: every live subscriber
//! receives every notification. Subscribers may register or drop out at any
//! time; the session and transport layers publish here instead of owning
//! their observers.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::events::Notification;

/// Cloneable handle to the shared bus.
#[derive(Clone, Default)]
pub struct NotificationBus {
    subscribers: Arc<Mutex<Vec<Sender<Notification>>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// Dropping the receiver unsubscribes; a one-shot subscription is a
    /// subscribe, one matching receive, then drop.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Fan a notification out to every live subscriber.
    pub fn publish(&self, notification: Notification) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// Number of live subscribers, counting ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TransportEvent;

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let bus = NotificationBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(Notification::Transport(TransportEvent::Connect));

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = NotificationBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        drop(b);

        bus.publish(Notification::Transport(TransportEvent::Disconnected));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let bus = NotificationBus::new();
        bus.publish(Notification::Transport(TransportEvent::Connect));

        let late = bus.subscribe();
        assert!(late.is_empty());
    }
}
