//! Resolved engine settings
//!
//! The UI layer owns persistence; the engine only consumes these values.
//! They can be read from JSON so the headless runner can be pointed at a file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::EngineError;

/// Identifies a device by driver API name and index within that API.
///
/// An empty `api` selects the platform default host. A `None` index selects
/// the default output device (audio) or the first port (MIDI).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceReference {
    pub api: String,
    pub index: Option<usize>,
}

impl DeviceReference {
    pub fn new(api: impl Into<String>, index: usize) -> Self {
        Self {
            api: api.into(),
            index: Some(index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub device: DeviceReference,
    pub sample_rate: u32,
    /// Requested block size in frames; the driver may negotiate a smaller one
    pub buffer_size: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device: DeviceReference::default(),
            sample_rate: 44100,
            buffer_size: 512,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// `None` runs without MIDI input
    pub device: Option<DeviceReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub audio: AudioSettings,
    pub midi: MidiSettings,
}

impl EngineSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| EngineError::ParseSettings {
            path: path.to_path_buf(),
            source,
        })
    }
}
