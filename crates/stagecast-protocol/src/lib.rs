//! Wire vocabulary and shared data model for stagecast.
//!
//! This crate defines the message envelope and command/acknowledgement
//! vocabulary exchanged with the remote coordination endpoint, the session
//! settings model, the quality preset catalog and the process-wide
//! notification bus that the transport and session layers publish to.

mod bus;
mod commands;
mod events;
mod message;
mod quality;
mod settings;
mod state;

pub use bus::NotificationBus;
pub use commands::{Command, InitSettings, NegotiationPayload};
pub use events::{Notification, SessionEvent, SettingChange, TransportEvent};
pub use message::{Ack, Envelope, MessageError};
pub use quality::{audio_encoding, resolve, video_encoding, CatalogError, Encoding, VideoEncoding};
pub use settings::{AudioSettings, MediaKind, Preset, Ratio, SdpKind, SessionDescription, VideoSettings};
pub use state::SessionState;
