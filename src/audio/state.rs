//! Engine state token shared between the control thread and the audio thread

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the engine.
///
/// Buffers and open device handles exist only while Running or Stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Stopped = 0,
    Running = 1,
    /// Stop was requested; the next audio callback finishes the stream
    Stopping = 2,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Stopped,
            1 => EngineState::Running,
            2 => EngineState::Stopping,
            _ => unreachable!("invalid engine state {}", value),
        }
    }
}

/// Single-word atomic holding an [`EngineState`]
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: EngineState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn load(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Compare-and-swap `from` -> `to`. Returns false if the current state was not `from`.
    #[inline]
    pub fn transition(&self, from: EngineState, to: EngineState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditional store, used for the forced transition to Stopped
    #[inline]
    pub fn force(&self, state: EngineState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(EngineState::Stopped)
    }
}
