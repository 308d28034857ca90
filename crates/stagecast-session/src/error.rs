//! Session error taxonomy.
//!
//! Only validation, device and registry errors are returned synchronously
//! to the caller. Remote rejections, transport failures and version
//! mismatches surface exclusively through bus notifications.

use thiserror::Error;

use crate::device::DeviceError;
use crate::registry::RegistryError;

/// Bad local argument or call in the wrong state; rejected before any
/// command is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `open` requires a resolved render target.
    #[error("missing render target")]
    MissingTarget,

    /// The operation is not allowed in the current session state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Gain must stay within 0-100.
    #[error("gain {0} out of range 0-100")]
    GainOutOfRange(u32),

    /// Capture height must be positive.
    #[error("capture height must be positive")]
    ZeroCaptureSize,

    /// Key frame interval must be positive.
    #[error("key frame interval must be positive")]
    ZeroKeyFrameInterval,

    /// `start` with connect needs a host or a stream registry.
    #[error("no remote endpoint resolvable and no host supplied")]
    NoEndpoint,
}

/// Errors a session operation can report to its immediate caller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("stream registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl SessionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
