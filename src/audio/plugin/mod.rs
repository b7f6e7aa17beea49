//! Plugin collaborator contract
//!
//! The engine drives whatever implements [`PluginHost`]; loading, activating
//! and running an actual plugin format lives behind this trait.

mod passthrough;

pub use passthrough::PassthroughHost;

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use super::buffer::ProcessBuffers;
use super::callback::BlockContext;

/// Native handle of the window a plugin editor should embed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWindow(pub usize);

/// Calls the engine makes into the plugin hosting layer.
///
/// `process_begin`, the `process_*` event calls and `process` run on the audio
/// thread and must not block. Everything else runs on the control thread.
/// Idle housekeeping goes through the separate [`PluginIdle`] handle so the
/// idle thread never contends with the audio thread for this object.
pub trait PluginHost: Send {
    /// Load plugin number `index` from the bundle at `path`
    fn load(&mut self, path: &Path, index: u32) -> bool;

    fn unload(&mut self);

    fn set_parent_window(&mut self, window: Option<ParentWindow>);

    /// Declare the port layout; buffers are lent to each `process` call
    fn set_ports(&mut self, inputs: usize, outputs: usize);

    fn activate(&mut self, sample_rate: f64, block_size: u32);

    fn deactivate(&mut self);

    fn process_begin(&mut self, ctx: &BlockContext);

    /// Read the input channels and write the output channels in place
    fn process(&mut self, buffers: &mut ProcessBuffers<'_>);

    fn process_note_on(&mut self, sample_offset: u32, channel: u8, key: u8, velocity: u8);

    fn process_note_off(&mut self, sample_offset: u32, channel: u8, key: u8, velocity: u8);

    /// Polyphonic (per-note) aftertouch
    fn process_note_at(&mut self, sample_offset: u32, channel: u8, key: u8, pressure: u8);

    fn process_cc(&mut self, sample_offset: u32, channel: u8, controller: u8, value: u8);

    /// `value` is the raw 14-bit bend, 0..=0x3FFF with the centre at 0x2000
    fn process_pitch_bend(&mut self, sample_offset: u32, channel: u8, value: u16);

    /// Main-side handle for the idle pump. It stays valid across load and
    /// unload; the engine asks for it once.
    fn idle_handle(&self) -> Arc<dyn PluginIdle>;
}

/// Housekeeping off the audio thread (GUI parameter flushes, callbacks).
///
/// Implementations must not take any lock the audio-side [`PluginHost`]
/// methods hold.
pub trait PluginIdle: Send + Sync {
    fn idle(&self);
}

/// Plugin slot shared by the control and audio threads
pub type SharedPlugin = Arc<Mutex<Box<dyn PluginHost>>>;

pub fn shared(plugin: Box<dyn PluginHost>) -> SharedPlugin {
    Arc::new(Mutex::new(plugin))
}
