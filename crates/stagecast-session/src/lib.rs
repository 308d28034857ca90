//! Broadcast session orchestration.
//!
//! A [`Broadcaster`] drives one capture session through its lifecycle:
//! load the remote component, initialize it, start and stop broadcasting,
//! and apply setting changes once the remote end confirms them. Sessions
//! share an event channel and a notification bus through [`AppContext`].

mod broadcaster;
mod config;
mod context;
mod device;
mod error;
mod registry;

pub use broadcaster::Broadcaster;
pub use config::{
    BroadcasterConfig, Generation, StartFailure, StartInfo, StartOptions, PROTOCOL_VERSION,
};
pub use context::AppContext;
pub use device::{DeviceError, LocalMedia, MediaDevice, NullDevice};
pub use error::{SessionError, ValidationError};
pub use registry::{RegistryError, StreamEndpoint, StreamRegistry};
