//! Session settings model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::quality::CatalogError;

/// A named quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Low,
    Medium,
    High,
}

impl Preset {
    /// Wire name of the preset.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Preset {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CatalogError::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which captured media a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl FromStr for MediaKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(CatalogError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera capture aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ratio {
    #[serde(rename = "16:9")]
    SixteenNine,
    #[serde(rename = "4:3")]
    FourThree,
}

impl Ratio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SixteenNine => "16:9",
            Self::FourThree => "4:3",
        }
    }
}

impl FromStr for Ratio {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(Self::SixteenNine),
            "4:3" => Ok(Self::FourThree),
            other => Err(CatalogError::UnknownRatio(other.to_string())),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video capture settings for one session.
///
/// Mutated only after the corresponding remote acknowledgement succeeds;
/// the remote capture device is the source of truth for applied values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Whether the camera is active.
    pub active: bool,

    /// Named quality preset the capture is sampled in.
    pub quality: Preset,

    /// Capture aspect ratio.
    pub ratio: Ratio,

    /// Capture height in pixels; width follows from the ratio.
    pub capture_height: u32,

    /// Capture framerate.
    pub fps: u32,

    /// Frames between key frames.
    pub key_frame_interval: u32,

    /// Target video bitrate in kbps.
    pub bitrate_kbps: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            active: true,
            quality: Preset::High,
            ratio: Ratio::SixteenNine,
            capture_height: 180,
            fps: 25,
            key_frame_interval: 50,
            bitrate_kbps: 800,
        }
    }
}

/// Audio capture settings for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Whether the microphone is active (unmuted).
    pub active: bool,

    /// Named quality preset the audio is sampled in.
    pub quality: Preset,

    /// Microphone gain, 0-100.
    pub gain: u32,

    /// Whether microphone loopback is enabled.
    pub loopback: bool,

    /// Target audio bitrate in kbps.
    pub bitrate_kbps: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            active: true,
            quality: Preset::Medium,
            gain: 75,
            loopback: false,
            bitrate_kbps: 96,
        }
    }
}

/// Whether a session description is an offer or an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// A serialized session description exchanged during negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_round_trip() {
        for name in ["low", "medium", "high"] {
            let preset: Preset = name.parse().unwrap();
            assert_eq!(preset.as_str(), name);
        }
        assert!("bogus".parse::<Preset>().is_err());
    }

    #[test]
    fn test_ratio_wire_names() {
        assert_eq!("16:9".parse::<Ratio>().unwrap(), Ratio::SixteenNine);
        assert_eq!("4:3".parse::<Ratio>().unwrap(), Ratio::FourThree);
        assert!("21:9".parse::<Ratio>().is_err());
        assert_eq!(
            serde_json::to_string(&Ratio::SixteenNine).unwrap(),
            "\"16:9\""
        );
    }

    #[test]
    fn test_default_settings() {
        let video = VideoSettings::default();
        assert!(video.active);
        assert_eq!(video.quality, Preset::High);
        assert_eq!(video.capture_height, 180);

        let audio = AudioSettings::default();
        assert_eq!(audio.quality, Preset::Medium);
        assert_eq!(audio.gain, 75);
        assert!(!audio.loopback);
    }
}
