//! Real-time audio/MIDI engine for a plugin host
//!
//! Binds an output device and an optional MIDI input, moves audio and MIDI
//! into the hosted plugin once per block, and keeps the plugin idling on a
//! background thread:
//! - Lifecycle state machine shared with the audio thread
//! - Lock-free MIDI queue with sample-accurate event placement
//! - Device binding over cpal and midir

pub mod buffer;
pub mod callback;
pub mod clock;
pub mod device;
pub mod engine;
pub mod error;
pub mod idle;
pub mod midi;
pub mod plugin;
pub mod settings;
pub mod state;

#[cfg(test)]
mod mock;

pub use engine::Engine;
pub use error::EngineError;
pub use settings::EngineSettings;
pub use state::EngineState;
