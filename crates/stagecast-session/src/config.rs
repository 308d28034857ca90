//! Broadcaster configuration and start options.

use serde::{Deserialize, Serialize};

use stagecast_protocol::{AudioSettings, VideoSettings};

/// Protocol version this library speaks; a remote component reporting a
/// different version is incompatible and fails the session.
pub const PROTOCOL_VERSION: &str = "2.1.0";

/// Which transport generation drives the media path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Command/acknowledgement pairs executed in a remote capture sandbox.
    #[default]
    Bridge,

    /// Native offer/answer negotiation over the event channel.
    Native,
}

/// Per-session configuration.
///
/// Settings are owned, fresh values per session; defaults are immutable
/// and never shared between instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcasterConfig {
    /// Session identifier carried in every notification.
    pub id: String,

    /// Opaque render target handle; `open` fails without one.
    pub target: Option<String>,

    /// Automatically start (with connect) once initialized.
    pub connect: bool,

    /// Placeholder image shown while the camera is off.
    pub image: String,

    pub generation: Generation,

    /// Expected remote component protocol version.
    pub protocol_version: String,

    pub video: VideoSettings,
    pub audio: AudioSettings,
}

impl BroadcasterConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: None,
            connect: false,
            image: "/static/images/stage/connection.jpg".to_string(),
            generation: Generation::default(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            video: VideoSettings::default(),
            audio: AudioSettings::default(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_connect(mut self, connect: bool) -> Self {
        self.connect = connect;
        self
    }

    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = generation;
        self
    }
}

/// Outcome details handed to the start success callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StartInfo {
    /// Resolved endpoint, when the session connected to one.
    pub endpoint: Option<String>,

    pub video_active: bool,
}

/// Failure details handed to the start error callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StartFailure {
    pub code: Option<i64>,
    pub message: String,
}

/// One-shot success callback for `start`.
pub type StartSuccessFn = Box<dyn FnOnce(StartInfo) + Send>;

/// One-shot error callback for `start`.
pub type StartErrorFn = Box<dyn FnOnce(StartFailure) + Send>;

/// Options for starting a session.
///
/// The callbacks fire at most once, on the start outcome, and are dropped
/// afterwards.
#[derive(Default)]
pub struct StartOptions {
    /// Connect to a remote endpoint; false starts local-only capture.
    pub connect: bool,

    /// Caller-supplied endpoint, bypassing the stream registry.
    pub host: Option<String>,

    /// Ask the registry to persist the allocation.
    pub store: bool,

    pub success: Option<StartSuccessFn>,
    pub error: Option<StartErrorFn>,
}

impl StartOptions {
    pub fn connect() -> Self {
        Self {
            connect: true,
            store: true,
            ..Self::default()
        }
    }

    pub fn local() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(StartInfo) + Send + 'static) -> Self {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(StartFailure) + Send + 'static) -> Self {
        self.error = Some(Box::new(callback));
        self
    }
}
