//! Notifications published on the bus.

use serde::{Deserialize, Serialize};

use crate::message::Envelope;
use crate::settings::{MediaKind, Ratio};

/// Everything the core broadcasts to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Transport channel lifecycle.
    Transport(TransportEvent),

    /// An inbound wire message, dispatched under its action namespace.
    Channel(Envelope),

    /// Session lifecycle and settings changes.
    Session(SessionEvent),
}

/// Transport channel events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransportEvent {
    /// The coordination link came up.
    Connect,

    /// The coordination link was torn down on purpose.
    Disconnected,

    /// The coordination link failed or could not be established.
    Error { reason: String },
}

/// Session events consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Remote component loaded and configured.
    Ready { id: String, version: String },

    /// The remote component's protocol version does not match this library.
    Incompatible { id: String, version: String },

    /// Remote initialization failed.
    InitFailed { id: String, code: Option<i64>, message: String },

    /// Session connected to the media server.
    Connected { id: String },

    /// Camera/microphone access was granted or refused.
    Authorized { id: String, ok: bool },

    /// Capture started.
    Started { id: String, authorized: bool, video_active: bool },

    /// Capture stopped.
    Stopped { id: String },

    /// The session failed.
    Failed { id: String, code: Option<i64>, message: String },

    /// A settings mutation was confirmed by the remote end.
    SettingChanged { id: String, change: SettingChange },

    /// A settings mutation was refused by the remote end.
    SettingRejected {
        id: String,
        setting: String,
        code: Option<i64>,
        message: String,
    },

    /// Microphone activity level report.
    MicActivity { id: String, level: f64 },

    /// Placeholder image shown or hidden.
    Image { id: String },
}

/// Which setting changed, with the confirmed value where the ack carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingChange {
    Quality { kind: MediaKind },
    Fps { value: u32 },
    KeyFrameInterval { value: u32 },
    Ratio { value: Ratio },
    CaptureSize { value: u32 },
    Gain { value: u32 },
    VideoActive { value: bool },
    Muted,
    Unmuted,
    Loopback { value: bool },
}

impl SettingChange {
    /// Scope name used in notifications and diagnostics.
    pub fn setting(&self) -> &'static str {
        match self {
            Self::Quality { .. } => "quality",
            Self::Fps { .. } => "fps",
            Self::KeyFrameInterval { .. } => "key_frame_interval",
            Self::Ratio { .. } => "ratio",
            Self::CaptureSize { .. } => "capture_size",
            Self::Gain { .. } => "gain",
            Self::VideoActive { .. } => "video_active",
            Self::Muted => "mute",
            Self::Unmuted => "unmute",
            Self::Loopback { .. } => "loopback",
        }
    }
}
