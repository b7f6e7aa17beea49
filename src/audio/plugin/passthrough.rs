//! Built-in collaborator that routes input straight to output

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ParentWindow, PluginHost, PluginIdle};
use crate::audio::buffer::ProcessBuffers;
use crate::audio::callback::BlockContext;

/// Copies inputs to outputs and counts the MIDI events it was sent.
///
/// Stands in for a real plugin so the engine can run headless.
#[derive(Debug, Default)]
pub struct PassthroughHost {
    path: Option<PathBuf>,
    active: bool,
    events: u64,
    idle: Arc<PassthroughIdle>,
}

#[derive(Debug, Default)]
struct PassthroughIdle;

impl PluginIdle for PassthroughIdle {
    fn idle(&self) {}
}

impl PassthroughHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PluginHost for PassthroughHost {
    fn load(&mut self, path: &Path, index: u32) -> bool {
        log::info!("Passthrough host: loading {:?} #{}", path, index);
        self.path = Some(path.to_path_buf());
        true
    }

    fn unload(&mut self) {
        if let Some(path) = self.path.take() {
            log::info!("Passthrough host: unloaded {:?}", path);
        }
    }

    fn set_parent_window(&mut self, window: Option<ParentWindow>) {
        log::debug!("Passthrough host: parent window {:?}", window);
    }

    fn set_ports(&mut self, inputs: usize, outputs: usize) {
        log::debug!("Passthrough host: {} in / {} out", inputs, outputs);
    }

    fn activate(&mut self, sample_rate: f64, block_size: u32) {
        self.active = true;
        log::info!(
            "Passthrough host activated: {}Hz, {} frames",
            sample_rate,
            block_size
        );
    }

    fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            log::info!("Passthrough host deactivated after {} MIDI events", self.events);
        }
    }

    fn process_begin(&mut self, _ctx: &BlockContext) {}

    fn process(&mut self, buffers: &mut ProcessBuffers<'_>) {
        let ProcessBuffers { inputs, outputs } = buffers;
        for (output, input) in outputs.iter_mut().zip(inputs.iter()) {
            output.copy_from_slice(input);
        }
    }

    fn process_note_on(&mut self, _sample_offset: u32, _channel: u8, _key: u8, _velocity: u8) {
        self.events += 1;
    }

    fn process_note_off(&mut self, _sample_offset: u32, _channel: u8, _key: u8, _velocity: u8) {
        self.events += 1;
    }

    fn process_note_at(&mut self, _sample_offset: u32, _channel: u8, _key: u8, _pressure: u8) {
        self.events += 1;
    }

    fn process_cc(&mut self, _sample_offset: u32, _channel: u8, _controller: u8, _value: u8) {
        self.events += 1;
    }

    fn process_pitch_bend(&mut self, _sample_offset: u32, _channel: u8, _value: u16) {
        self.events += 1;
    }

    fn idle_handle(&self) -> Arc<dyn PluginIdle> {
        self.idle.clone()
    }
}
