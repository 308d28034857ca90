//! Quality preset catalog.
//!
//! Static mapping of named presets to the numeric capture parameters sent
//! on the wire. Pure lookup, no state.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{MediaKind, Preset};

/// Errors raised while resolving preset names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The preset name is not part of the catalog.
    #[error("unknown quality preset: {0}")]
    UnknownPreset(String),

    /// The media kind is not video or audio.
    #[error("unknown media kind: {0}")]
    UnknownKind(String),

    /// The ratio is not one of the supported values.
    #[error("unknown capture ratio: {0}")]
    UnknownRatio(String),
}

/// Concrete video encoding parameters for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEncoding {
    /// Capture quality, 1-100.
    pub quality: u32,

    /// Capture framerate.
    pub fps: u32,
}

/// Encoding parameters resolved from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Video(VideoEncoding),
    /// Audio gain units.
    Audio(u32),
}

/// Video encoding parameters for a preset.
pub fn video_encoding(preset: Preset) -> VideoEncoding {
    match preset {
        Preset::Low => VideoEncoding { quality: 40, fps: 15 },
        Preset::Medium => VideoEncoding { quality: 70, fps: 20 },
        Preset::High => VideoEncoding { quality: 90, fps: 25 },
    }
}

/// Audio encoding parameter for a preset, in abstract gain units.
pub fn audio_encoding(preset: Preset) -> u32 {
    match preset {
        Preset::Low => 3,
        Preset::Medium => 6,
        Preset::High => 9,
    }
}

/// Resolve a preset by wire names.
///
/// Unrecognized names produce a [`CatalogError`], never a panic. Typed
/// callers should go through [`video_encoding`]/[`audio_encoding`] instead.
pub fn resolve(kind: &str, preset: &str) -> Result<Encoding, CatalogError> {
    let kind = MediaKind::from_str(kind)?;
    let preset = Preset::from_str(preset)?;

    Ok(match kind {
        MediaKind::Video => Encoding::Video(video_encoding(preset)),
        MediaKind::Audio => Encoding::Audio(audio_encoding(preset)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_table() {
        assert_eq!(
            resolve("video", "low").unwrap(),
            Encoding::Video(VideoEncoding { quality: 40, fps: 15 })
        );
        assert_eq!(
            resolve("video", "medium").unwrap(),
            Encoding::Video(VideoEncoding { quality: 70, fps: 20 })
        );
        assert_eq!(
            resolve("video", "high").unwrap(),
            Encoding::Video(VideoEncoding { quality: 90, fps: 25 })
        );
    }

    #[test]
    fn test_audio_table() {
        assert_eq!(resolve("audio", "low").unwrap(), Encoding::Audio(3));
        assert_eq!(resolve("audio", "medium").unwrap(), Encoding::Audio(6));
        assert_eq!(resolve("audio", "high").unwrap(), Encoding::Audio(9));
    }

    #[test]
    fn test_unknown_names_fail() {
        assert_eq!(
            resolve("video", "bogus"),
            Err(CatalogError::UnknownPreset("bogus".to_string()))
        );
        assert_eq!(
            resolve("screen", "high"),
            Err(CatalogError::UnknownKind("screen".to_string()))
        );
    }
}
