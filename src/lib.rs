pub mod audio;

pub use audio::{Engine, EngineError, EngineSettings, EngineState};
