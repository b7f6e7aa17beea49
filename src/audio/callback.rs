//! Per-block audio callback
//!
//! An [`AudioCallback`] is built by the engine before the output stream is
//! opened and moved into the driver's stream. It owns the sample buffers and
//! the consumer side of the MIDI queue, so both are freed exactly when the
//! stream is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::buffer::{SampleBufferSet, CHANNELS};
use super::clock::EngineClock;
use super::midi::{translate, MidiConsumer};
use super::plugin::SharedPlugin;
use super::state::{EngineState, StateCell};

/// Per-block information handed to the plugin at `process_begin`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockContext {
    pub frame_count: u32,
    /// Engine-clock seconds at which the block was requested
    pub current_time: f64,
    /// Frames processed by the engine before this block
    pub steady_time: u64,
}

/// What the callback tells the driver after a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSignal {
    Continue,
    /// The engine is stopping; no further blocks should be requested
    Stop,
}

pub struct AudioCallback {
    buffers: SampleBufferSet,
    midi: Option<MidiConsumer>,
    plugin: SharedPlugin,
    state: Arc<StateCell>,
    steady_time: Arc<AtomicU64>,
    clock: EngineClock,
    sample_rate: f64,
    /// Set once the engine has been seen Running
    started: bool,
    /// Set once Stop has been returned
    finished: bool,
}

impl AudioCallback {
    pub fn new(
        buffers: SampleBufferSet,
        midi: Option<MidiConsumer>,
        plugin: SharedPlugin,
        state: Arc<StateCell>,
        steady_time: Arc<AtomicU64>,
        clock: EngineClock,
        sample_rate: f64,
    ) -> Self {
        Self {
            buffers,
            midi,
            plugin,
            state,
            steady_time,
            clock,
            sample_rate,
            started: false,
            finished: false,
        }
    }

    pub fn buffers(&self) -> &SampleBufferSet {
        &self.buffers
    }

    pub fn has_midi_input(&self) -> bool {
        self.midi.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rate used to place MIDI events, once the driver has settled on one
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Driver entry point. Stamps the block with the engine clock and renders
    /// silence once the stream has been told to stop.
    pub fn run(&mut self, output: &mut [f32], input: Option<&[f32]>) -> StreamSignal {
        if self.finished {
            output.fill(0.0);
            return StreamSignal::Stop;
        }
        let signal = self.process_block(output, input, self.clock.now_secs());
        if signal == StreamSignal::Stop {
            self.finished = true;
        }
        signal
    }

    /// Process one block of interleaved stereo.
    ///
    /// Panics if the block is larger than the buffers, or if the engine is
    /// Stopped after this callback has already run: both mean the stream
    /// outlived the lifecycle that owns it.
    pub fn process_block(
        &mut self,
        output: &mut [f32],
        input: Option<&[f32]>,
        current_time: f64,
    ) -> StreamSignal {
        let frames = output.len() / CHANNELS;
        assert!(
            frames <= self.buffers.capacity(),
            "driver block of {} frames exceeds buffer capacity {}",
            frames,
            self.buffers.capacity()
        );

        // Callbacks delivered while the stream is still being opened
        if !self.started {
            if self.state.load() == EngineState::Stopped {
                output.fill(0.0);
                return StreamSignal::Continue;
            }
            self.started = true;
        }

        if let Some(input) = input {
            self.buffers.deinterleave_input(input, frames);
        }

        let ctx = BlockContext {
            frame_count: frames as u32,
            current_time,
            steady_time: self.steady_time.load(Ordering::Relaxed),
        };

        // Never wait on the control thread (plugin load/unload); render silence instead
        match self.plugin.try_lock() {
            Some(mut plugin) => {
                plugin.process_begin(&ctx);
                if let Some(midi) = self.midi.as_mut() {
                    translate::drain(midi, &ctx, self.sample_rate, &mut **plugin);
                }
                plugin.process(&mut self.buffers.ports(frames));
                self.buffers.interleave_output(output, frames);
            }
            None => output.fill(0.0),
        }

        self.steady_time.fetch_add(frames as u64, Ordering::Relaxed);

        match self.state.load() {
            EngineState::Running => StreamSignal::Continue,
            EngineState::Stopping => {
                self.state
                    .transition(EngineState::Stopping, EngineState::Stopped);
                StreamSignal::Stop
            }
            EngineState::Stopped => unreachable!("audio callback ran after the engine stopped"),
        }
    }
}
