//! Local media device collaborator.
//!
//! Device capture lives below this crate; the session only needs to
//! acquire media, build an offer bound to it and apply the remote answer.
//! Acquisition failure is local and retriable: it never moves the session
//! to `Failed`.

use thiserror::Error;

use stagecast_protocol::{AudioSettings, SessionDescription, VideoSettings};

/// Errors reported by the capture device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The user refused camera/microphone access.
    #[error("capture permission denied")]
    PermissionDenied,

    /// No usable capture device.
    #[error("no capture device: {0}")]
    NoDevice(String),

    /// Building or applying a session description failed.
    #[error("negotiation failed: {0}")]
    Negotiation(String),
}

/// Handle to an acquired local capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMedia {
    /// Opaque stream identifier assigned by the device layer.
    pub stream_id: String,

    pub has_video: bool,
    pub has_audio: bool,
}

/// The capture device seam.
pub trait MediaDevice: Send {
    /// Acquire local media matching the session settings.
    fn acquire(
        &mut self,
        video: &VideoSettings,
        audio: &AudioSettings,
    ) -> Result<LocalMedia, DeviceError>;

    /// Build an offer bound to the acquired media.
    fn create_offer(&mut self, media: &LocalMedia) -> Result<SessionDescription, DeviceError>;

    /// Apply the remote answer, finalizing the media path.
    fn apply_answer(
        &mut self,
        media: &LocalMedia,
        answer: &SessionDescription,
    ) -> Result<(), DeviceError>;

    /// Feed a trickled remote candidate. Best effort: losing one degrades
    /// connectivity but is not a protocol error.
    fn add_candidate(&mut self, media: &LocalMedia, candidate: &str) -> Result<(), DeviceError> {
        let _ = (media, candidate);
        Ok(())
    }

    /// Release the acquired media.
    fn release(&mut self, media: LocalMedia) {
        let _ = media;
    }
}

/// Device for bridge-generation sessions, where capture happens inside the
/// remote execution sandbox and the local process never opens a device.
#[derive(Debug, Default)]
pub struct NullDevice;

impl MediaDevice for NullDevice {
    fn acquire(
        &mut self,
        _video: &VideoSettings,
        _audio: &AudioSettings,
    ) -> Result<LocalMedia, DeviceError> {
        Err(DeviceError::NoDevice("no local capture in bridge mode".to_string()))
    }

    fn create_offer(&mut self, _media: &LocalMedia) -> Result<SessionDescription, DeviceError> {
        Err(DeviceError::Negotiation("no local capture in bridge mode".to_string()))
    }

    fn apply_answer(
        &mut self,
        _media: &LocalMedia,
        _answer: &SessionDescription,
    ) -> Result<(), DeviceError> {
        Err(DeviceError::Negotiation("no local capture in bridge mode".to_string()))
    }
}
