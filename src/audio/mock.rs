//! Test doubles for the plugin collaborator and the device backends
//!
//! The mock streams keep the audio callback in a shared slot so tests can
//! drive blocks by hand, the way a driver thread would.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::buffer::{ProcessBuffers, CHANNELS};
use super::callback::{AudioCallback, BlockContext, StreamSignal};
use super::clock::EngineClock;
use super::device::{AudioBackend, OutputRequest, OutputStream};
use super::error::{DeviceKind, EngineError};
use super::midi::{push_message, MidiBackend, MidiMessage, MidiPort, MidiProducer};
use super::plugin::{ParentWindow, PluginHost, PluginIdle};
use super::settings::DeviceReference;

// =============================================================================
// Plugin
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PluginCall {
    Load { path: String, index: u32 },
    Unload,
    SetParentWindow(Option<ParentWindow>),
    SetPorts { inputs: usize, outputs: usize },
    Activate { sample_rate: f64, block_size: u32 },
    Deactivate,
    ProcessBegin { frames: u32, steady_time: u64 },
    Process { frames: usize },
    NoteOn { offset: u32, channel: u8, key: u8, value: u8 },
    NoteOff { offset: u32, channel: u8, key: u8, value: u8 },
    NoteAt { offset: u32, channel: u8, key: u8, value: u8 },
    Cc { offset: u32, channel: u8, controller: u8, value: u8 },
    PitchBend { offset: u32, channel: u8, value: u16 },
}

/// What a [`RecordingHost`] saw, readable after the host moved into the engine
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<PluginCall>>,
    idles: AtomicU64,
}

impl Recorder {
    pub fn calls(&self) -> Vec<PluginCall> {
        self.calls.lock().clone()
    }

    pub fn idles(&self) -> u64 {
        self.idles.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn push(&self, call: PluginCall) {
        self.calls.lock().push(call);
    }
}

/// Main-side handle of a [`RecordingHost`]: counts idle calls, optionally
/// taking `delay` over each one
pub struct RecordingIdle {
    recorder: Arc<Recorder>,
    delay: Duration,
}

impl PluginIdle for RecordingIdle {
    fn idle(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.recorder.idles.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every call and doubles the input signal into the outputs.
/// Idle calls are counted rather than recorded.
pub struct RecordingHost {
    recorder: Arc<Recorder>,
    idle: Arc<RecordingIdle>,
    load_result: bool,
}

impl RecordingHost {
    pub fn new() -> (Self, Arc<Recorder>) {
        Self::with_idle_delay(Duration::ZERO)
    }

    /// A host whose idle housekeeping takes `delay` per call
    pub fn with_idle_delay(delay: Duration) -> (Self, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            Self {
                recorder: Arc::clone(&recorder),
                idle: Arc::new(RecordingIdle {
                    recorder: Arc::clone(&recorder),
                    delay,
                }),
                load_result: true,
            },
            recorder,
        )
    }

    /// A host whose `load` always fails
    pub fn failing_load() -> (Self, Arc<Recorder>) {
        let (mut host, recorder) = Self::new();
        host.load_result = false;
        (host, recorder)
    }
}

impl PluginHost for RecordingHost {
    fn load(&mut self, path: &Path, index: u32) -> bool {
        self.recorder.push(PluginCall::Load {
            path: path.display().to_string(),
            index,
        });
        self.load_result
    }

    fn unload(&mut self) {
        self.recorder.push(PluginCall::Unload);
    }

    fn set_parent_window(&mut self, window: Option<ParentWindow>) {
        self.recorder.push(PluginCall::SetParentWindow(window));
    }

    fn set_ports(&mut self, inputs: usize, outputs: usize) {
        self.recorder.push(PluginCall::SetPorts { inputs, outputs });
    }

    fn activate(&mut self, sample_rate: f64, block_size: u32) {
        self.recorder.push(PluginCall::Activate {
            sample_rate,
            block_size,
        });
    }

    fn deactivate(&mut self) {
        self.recorder.push(PluginCall::Deactivate);
    }

    fn process_begin(&mut self, ctx: &BlockContext) {
        self.recorder.push(PluginCall::ProcessBegin {
            frames: ctx.frame_count,
            steady_time: ctx.steady_time,
        });
    }

    fn process(&mut self, buffers: &mut ProcessBuffers<'_>) {
        for ch in 0..CHANNELS {
            for (out, input) in buffers.outputs[ch].iter_mut().zip(buffers.inputs[ch]) {
                *out = input * 2.0;
            }
        }
        self.recorder.push(PluginCall::Process {
            frames: buffers.frames(),
        });
    }

    fn process_note_on(&mut self, offset: u32, channel: u8, key: u8, value: u8) {
        self.recorder.push(PluginCall::NoteOn { offset, channel, key, value });
    }

    fn process_note_off(&mut self, offset: u32, channel: u8, key: u8, value: u8) {
        self.recorder.push(PluginCall::NoteOff { offset, channel, key, value });
    }

    fn process_note_at(&mut self, offset: u32, channel: u8, key: u8, value: u8) {
        self.recorder.push(PluginCall::NoteAt { offset, channel, key, value });
    }

    fn process_cc(&mut self, offset: u32, channel: u8, controller: u8, value: u8) {
        self.recorder.push(PluginCall::Cc {
            offset,
            channel,
            controller,
            value,
        });
    }

    fn process_pitch_bend(&mut self, offset: u32, channel: u8, value: u16) {
        self.recorder.push(PluginCall::PitchBend { offset, channel, value });
    }

    fn idle_handle(&self) -> Arc<dyn PluginIdle> {
        self.idle.clone()
    }
}

// =============================================================================
// Logging
// =============================================================================

thread_local! {
    static LOG_RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps what the current thread logs at `Info` or above, like the binary's
/// default env_logger filter
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            LOG_RECORDS.with(|r| r.borrow_mut().push((record.level(), record.args().to_string())));
        }
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

/// Run `f` and return the records it logged on this thread
pub fn capture_logs(f: impl FnOnce()) -> Vec<(log::Level, String)> {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        if log::set_logger(&CAPTURE_LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }
    });

    LOG_RECORDS.with(|r| r.borrow_mut().clear());
    f();
    LOG_RECORDS.with(|r| r.borrow_mut().drain(..).collect())
}

// =============================================================================
// Audio backend
// =============================================================================

#[derive(Default)]
struct MockStreamState {
    callback: Option<AudioCallback>,
    opens: usize,
    playing: bool,
    close_signal: Option<StreamSignal>,
}

/// Test-side view of whatever stream the mock backend currently has open
#[derive(Clone, Default)]
pub struct MockStreamHandle {
    inner: Rc<RefCell<MockStreamState>>,
}

impl MockStreamHandle {
    /// True while a stream owns an audio callback
    pub fn is_open(&self) -> bool {
        self.inner.borrow().callback.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.borrow().playing
    }

    pub fn opens(&self) -> usize {
        self.inner.borrow().opens
    }

    pub fn buffer_capacity(&self) -> Option<usize> {
        self.inner
            .borrow()
            .callback
            .as_ref()
            .map(|cb| cb.buffers().capacity())
    }

    pub fn has_midi_input(&self) -> bool {
        self.inner
            .borrow()
            .callback
            .as_ref()
            .map(|cb| cb.has_midi_input())
            .unwrap_or(false)
    }

    /// Signal returned by the in-flight block run while the stream closed
    pub fn close_signal(&self) -> Option<StreamSignal> {
        self.inner.borrow().close_signal
    }

    /// Run one block of silence-in through the open stream
    pub fn run_block(&self, frames: usize) -> (Vec<f32>, StreamSignal) {
        let input = vec![0.0f32; frames * CHANNELS];
        self.run_block_with(&input)
    }

    pub fn run_block_with(&self, input: &[f32]) -> (Vec<f32>, StreamSignal) {
        let mut output = vec![0.0f32; input.len()];
        let mut state = self.inner.borrow_mut();
        let callback = state.callback.as_mut().expect("no stream is open");
        let signal = callback.run(&mut output, Some(input));
        (output, signal)
    }
}

pub struct MockAudioBackend {
    handle: MockStreamHandle,
    negotiated: Option<u32>,
    fail: bool,
    block_on_close: bool,
}

impl MockAudioBackend {
    /// Backend that accepts whatever block size is requested
    pub fn new() -> (Self, MockStreamHandle) {
        let handle = MockStreamHandle::default();
        (
            Self {
                handle: handle.clone(),
                negotiated: None,
                fail: false,
                block_on_close: false,
            },
            handle,
        )
    }

    /// Backend whose device throws on open
    pub fn failing() -> (Self, MockStreamHandle) {
        let (mut backend, handle) = Self::new();
        backend.fail = true;
        (backend, handle)
    }

    /// Commit to `block_size` regardless of the request
    pub fn negotiating(mut self, block_size: u32) -> Self {
        self.negotiated = Some(block_size);
        self
    }

    /// Deliver one more block while the stream is being closed
    pub fn with_block_on_close(mut self) -> Self {
        self.block_on_close = true;
        self
    }
}

impl AudioBackend for MockAudioBackend {
    fn open_output(
        &mut self,
        _device: &DeviceReference,
        request: &OutputRequest,
        callback: AudioCallback,
    ) -> Result<Box<dyn OutputStream>, EngineError> {
        if self.fail {
            return Err(EngineError::BuildStream("mock device failed".to_string()));
        }
        let block_size = self.negotiated.unwrap_or(request.block_size);
        {
            let mut state = self.handle.inner.borrow_mut();
            state.callback = Some(callback);
            state.opens += 1;
            state.close_signal = None;
        }
        Ok(Box::new(MockOutputStream {
            handle: self.handle.clone(),
            block_size,
            sample_rate: request.sample_rate,
            block_on_close: self.block_on_close,
        }))
    }
}

struct MockOutputStream {
    handle: MockStreamHandle,
    block_size: u32,
    sample_rate: u32,
    block_on_close: bool,
}

impl OutputStream for MockOutputStream {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.handle.inner.borrow_mut().playing = true;
        Ok(())
    }
}

impl Drop for MockOutputStream {
    fn drop(&mut self) {
        let mut state = self.handle.inner.borrow_mut();
        state.playing = false;
        if let Some(mut callback) = state.callback.take() {
            if self.block_on_close {
                let mut output = vec![0.0f32; self.block_size as usize * CHANNELS];
                state.close_signal = Some(callback.run(&mut output, None));
            }
        }
    }
}

// =============================================================================
// MIDI backend
// =============================================================================

/// Test-side view of the open MIDI port
#[derive(Clone, Default)]
pub struct MockMidiHandle {
    producer: Rc<RefCell<Option<MidiProducer>>>,
}

impl MockMidiHandle {
    pub fn is_open(&self) -> bool {
        self.producer.borrow().is_some()
    }

    /// Deliver a message as the device would
    pub fn send(&self, bytes: &[u8], timestamp: f64) -> bool {
        let mut producer = self.producer.borrow_mut();
        match (producer.as_mut(), MidiMessage::from_bytes(bytes, timestamp)) {
            (Some(producer), Some(message)) => push_message(producer, message),
            _ => false,
        }
    }
}

pub struct MockMidiBackend {
    handle: MockMidiHandle,
    fail: bool,
}

impl MockMidiBackend {
    pub fn new() -> (Self, MockMidiHandle) {
        let handle = MockMidiHandle::default();
        (
            Self {
                handle: handle.clone(),
                fail: false,
            },
            handle,
        )
    }

    pub fn failing() -> (Self, MockMidiHandle) {
        let (mut backend, handle) = Self::new();
        backend.fail = true;
        (backend, handle)
    }
}

impl MidiBackend for MockMidiBackend {
    fn open_input(
        &mut self,
        device: &DeviceReference,
        producer: MidiProducer,
        _clock: EngineClock,
    ) -> Result<Box<dyn MidiPort>, EngineError> {
        if self.fail {
            return Err(EngineError::DeviceNotFound {
                kind: DeviceKind::Midi,
                index: device.index.unwrap_or(0),
            });
        }
        *self.handle.producer.borrow_mut() = Some(producer);
        Ok(Box::new(MockMidiPort {
            handle: self.handle.clone(),
        }))
    }
}

struct MockMidiPort {
    handle: MockMidiHandle,
}

impl MidiPort for MockMidiPort {
    fn name(&self) -> &str {
        "mock-midi"
    }
}

impl Drop for MockMidiPort {
    fn drop(&mut self) {
        self.handle.producer.borrow_mut().take();
    }
}
