//! Stream registry collaborator.
//!
//! Allocates a remote stream endpoint for sessions started without a
//! caller-supplied target.

use thiserror::Error;

/// Errors reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry refused the allocation.
    #[error("allocation refused: {0}")]
    Refused(String),

    /// The registry could not be reached.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// A remote media endpoint a session can publish to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    /// Push address of the media server or peer.
    pub url: String,
}

/// The endpoint allocation seam.
pub trait StreamRegistry: Send {
    /// Allocate (or reuse) a stream endpoint. `store` asks the registry to
    /// persist the allocation for later lookup.
    fn allocate(&mut self, store: bool) -> Result<StreamEndpoint, RegistryError>;
}
