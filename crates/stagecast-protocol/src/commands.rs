//! Commands sent to the remote capture endpoint.
//!
//! Every command is answered by an acknowledgement envelope carrying the
//! same action name; acks are correlated by that name, never by arrival
//! order.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::message::Envelope;
use crate::settings::{MediaKind, Ratio, SessionDescription};

/// Initial configuration pushed once the remote component has loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitSettings {
    /// Resolved video capture quality, 1-100.
    pub video_quality: u32,

    /// Resolved audio quality in gain units.
    pub audio_quality: u32,

    /// Capture framerate.
    pub fps: u32,

    /// Capture aspect ratio.
    pub ratio: Ratio,

    /// Capture height in pixels.
    pub capture_size: u32,

    /// Microphone gain, 0-100.
    pub gain: u32,

    /// Whether the camera starts active.
    pub video_active: bool,

    /// Placeholder image shown while the camera is off.
    pub image: String,
}

/// Offer/answer forwarded to the remote party during negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationPayload {
    /// Address of the remote endpoint the description is for.
    pub to: String,

    /// Session the description belongs to, used for correlation.
    pub session: String,

    pub description: SessionDescription,
}

/// The command vocabulary of the session protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init(InitSettings),
    Start { url: Option<String> },
    Stop,
    SetQuality { kind: MediaKind, value: u32 },
    SetFps { value: u32 },
    SetKeyFrameInterval { value: u32 },
    SetRatio { value: Ratio },
    SetCaptureSize { value: u32 },
    SetGain { value: u32 },
    SetVideoActive { value: bool },
    Mute,
    Unmute,
    SetLoopback { value: bool },
    SetImage { value: String, display: bool },
    HideImage,
    Dispatch(NegotiationPayload),
}

impl Command {
    /// Wire action name, shared with the matching acknowledgement.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::SetQuality { .. } => "set_quality",
            Self::SetFps { .. } => "set_fps",
            Self::SetKeyFrameInterval { .. } => "set_key_frame_interval",
            Self::SetRatio { .. } => "set_ratio",
            Self::SetCaptureSize { .. } => "set_capture_size",
            Self::SetGain { .. } => "set_gain",
            Self::SetVideoActive { .. } => "set_video_active",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::SetLoopback { .. } => "set_loopback",
            Self::SetImage { .. } => "set_image",
            Self::HideImage => "hide_image",
            Self::Dispatch(_) => "dispatch",
        }
    }

    /// Build the wire envelope for this command.
    pub fn into_envelope(self) -> Envelope {
        let env = Envelope::new(self.action());

        match self {
            Self::Init(settings) => env
                .with("video_quality", settings.video_quality)
                .with("audio_quality", settings.audio_quality)
                .with("fps", settings.fps)
                .with("ratio", settings.ratio.as_str())
                .with("capture_size", settings.capture_size)
                .with("gain", settings.gain)
                .with("video_active", settings.video_active)
                .with("image", settings.image),
            Self::Start { url } => match url {
                Some(url) => env.with("url", url),
                None => env,
            },
            Self::SetQuality { kind, value } => {
                env.with("type", kind.as_str()).with("value", value)
            }
            Self::SetFps { value } => env.with("value", value),
            Self::SetKeyFrameInterval { value } => env.with("value", value),
            Self::SetRatio { value } => env.with("value", value.as_str()),
            Self::SetCaptureSize { value } => env.with("value", value),
            Self::SetGain { value } => env.with("value", value),
            Self::SetVideoActive { value } => env.with("value", value),
            Self::SetLoopback { value } => env.with("value", value),
            Self::SetImage { value, display } => {
                env.with("value", value).with("display", display)
            }
            Self::Dispatch(payload) => env
                .with("to", payload.to)
                .with("session", payload.session)
                .with("description", json!(payload.description)),
            Self::Stop | Self::Mute | Self::Unmute | Self::HideImage => env,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SdpKind;

    #[test]
    fn test_action_names_match_vocabulary() {
        assert_eq!(Command::Stop.action(), "stop");
        assert_eq!(
            Command::SetQuality { kind: MediaKind::Video, value: 90 }.action(),
            "set_quality"
        );
        assert_eq!(Command::SetFps { value: 25 }.action(), "set_fps");
        assert_eq!(Command::Mute.action(), "mute");
    }

    #[test]
    fn test_quality_envelope_payload() {
        let env = Command::SetQuality { kind: MediaKind::Audio, value: 6 }.into_envelope();
        assert_eq!(env.action, "set_quality");
        assert_eq!(env.str_field("type").unwrap(), "audio");
        assert_eq!(env.u64_field("value").unwrap(), 6);
    }

    #[test]
    fn test_start_envelope_with_url() {
        let env = Command::Start { url: Some("rtmp://media/point".into()) }.into_envelope();
        assert_eq!(env.str_field("url").unwrap(), "rtmp://media/point");

        let env = Command::Start { url: None }.into_envelope();
        assert!(env.fields.get("url").is_none());
    }

    #[test]
    fn test_dispatch_envelope_carries_description() {
        let env = Command::Dispatch(NegotiationPayload {
            to: "media-7".into(),
            session: "cast-1".into(),
            description: SessionDescription { kind: SdpKind::Offer, sdp: "v=0".into() },
        })
        .into_envelope();

        assert_eq!(env.str_field("session").unwrap(), "cast-1");
        let desc: SessionDescription = env.typed_field("description").unwrap();
        assert_eq!(desc.kind, SdpKind::Offer);
        assert_eq!(desc.sdp, "v=0");
    }
}
