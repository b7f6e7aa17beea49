//! Error types for device binding and engine start-up

use std::path::PathBuf;

/// Errors surfaced by the engine and its device backends
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested host/API is not compiled in or not available
    #[error("{kind} API '{api}' is not available")]
    UnsupportedApi { kind: DeviceKind, api: String },

    /// No device exists at the requested index
    #[error("{kind} device {index} not found")]
    DeviceNotFound { kind: DeviceKind, index: usize },

    /// No index was given and the host has no default device
    #[error("no default {0} device")]
    NoDefaultDevice(DeviceKind),

    /// Failed to enumerate devices or query a device's configuration
    #[error("failed to query {kind} device: {message}")]
    DeviceQuery { kind: DeviceKind, message: String },

    #[error("failed to build output stream: {0}")]
    BuildStream(String),

    #[error("failed to start output stream: {0}")]
    PlayStream(String),

    #[error("MIDI input error: {0}")]
    Midi(String),

    #[error("failed to read settings {path:?}: {source}")]
    ReadSettings {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings {path:?}: {source}")]
    ParseSettings {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl EngineError {
    /// True when the error means "the device is not there" rather than an
    /// unexpected failure while talking to a device that exists
    pub fn is_device_absent(&self) -> bool {
        matches!(
            self,
            EngineError::UnsupportedApi { .. }
                | EngineError::DeviceNotFound { .. }
                | EngineError::NoDefaultDevice(_)
        )
    }
}

/// Which kind of device an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Audio,
    Midi,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Audio => f.write_str("audio"),
            DeviceKind::Midi => f.write_str("MIDI"),
        }
    }
}
