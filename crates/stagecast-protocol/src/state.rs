//! Session lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one broadcast session.
///
/// Transitions only happen through the session state machine; `Stopped` is
/// terminal for the attempt but a stopped session may be restarted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No remote component requested yet.
    #[default]
    Uninitialized,

    /// Waiting for the remote capture component to load.
    Loading,

    /// Loaded and configured, ready to start.
    Initialized,

    /// Start issued, waiting for the outcome.
    Starting,

    /// Capture running.
    Started,

    /// Stop issued, waiting for confirmation.
    Stopping,

    /// Capture stopped; restart is allowed.
    Stopped,

    /// Fatal failure for this session.
    Failed,
}

impl SessionState {
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether `start` may be issued from this state.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Initialized | Self::Stopped)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Loading => "Loading",
            Self::Initialized => "Initialized",
            Self::Starting => "Starting",
            Self::Started => "Started",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
        }
    }
}
