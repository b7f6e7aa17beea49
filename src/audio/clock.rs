//! Common time base for MIDI timestamps and audio callbacks
//!
//! cpal and midir each report time against their own origin, so the engine
//! stamps both sides from one monotonic clock instead.

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    origin: Instant,
}

impl EngineClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created
    #[inline]
    pub fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}
