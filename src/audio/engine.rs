//! Engine lifecycle: opens the devices, runs the plugin, closes everything down
//!
//! The engine lives on the control thread. The audio callback it builds runs
//! on the driver's thread and talks back only through the state token, the
//! steady-time counter and the shared plugin slot.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::buffer::{SampleBufferSet, CHANNELS, MAX_BLOCK_FRAMES};
use super::callback::AudioCallback;
use super::clock::EngineClock;
use super::device::{AudioBackend, CpalBackend, OutputRequest, OutputStream};
use super::error::EngineError;
use super::idle::IdlePump;
use super::midi::{midi_queue, MidiBackend, MidiConsumer, MidiPort, MidirBackend, MIDI_QUEUE_CAPACITY};
use super::plugin::{self, ParentWindow, PluginHost, PluginIdle, SharedPlugin};
use super::settings::EngineSettings;
use super::state::{EngineState, StateCell};

pub struct Engine {
    settings: EngineSettings,
    audio_backend: Box<dyn AudioBackend>,
    midi_backend: Box<dyn MidiBackend>,
    plugin: SharedPlugin,
    state: Arc<StateCell>,
    /// Frames processed since the engine was created; never reset
    steady_time: Arc<AtomicU64>,
    clock: EngineClock,
    stream: Option<Box<dyn OutputStream>>,
    midi_in: Option<Box<dyn MidiPort>>,
    block_size: u32,
    sample_rate: u32,
    parent_window: Option<ParentWindow>,
    /// Owned here; the idle pump only holds a weak reference
    _idle_handle: Arc<dyn PluginIdle>,
    _idle: IdlePump,
}

impl Engine {
    /// Engine bound to the system's audio (cpal) and MIDI (midir) drivers
    pub fn new(settings: EngineSettings, plugin: Box<dyn PluginHost>) -> Self {
        Self::with_backends(
            settings,
            plugin,
            Box::new(CpalBackend::new()),
            Box::new(MidirBackend::new()),
        )
    }

    pub fn with_backends(
        settings: EngineSettings,
        plugin: Box<dyn PluginHost>,
        audio_backend: Box<dyn AudioBackend>,
        midi_backend: Box<dyn MidiBackend>,
    ) -> Self {
        let idle_handle = plugin.idle_handle();
        let idle = IdlePump::new(Arc::downgrade(&idle_handle));
        let plugin = plugin::shared(plugin);

        Self {
            block_size: settings.audio.buffer_size,
            sample_rate: settings.audio.sample_rate,
            settings,
            audio_backend,
            midi_backend,
            plugin,
            state: Arc::new(StateCell::default()),
            steady_time: Arc::new(AtomicU64::new(0)),
            clock: EngineClock::new(),
            stream: None,
            midi_in: None,
            parent_window: None,
            _idle_handle: idle_handle,
            _idle: idle,
        }
    }

    /// Open the configured devices and start processing.
    ///
    /// Panics if the engine is not Stopped. On error everything opened so far
    /// is closed again and the engine stays Stopped.
    pub fn start(&mut self) -> Result<(), EngineError> {
        assert_eq!(
            self.state(),
            EngineState::Stopped,
            "engine started while not stopped"
        );

        match self.try_start() {
            Ok(()) => {
                log::info!(
                    "Audio engine started: {} Hz, {} frames, MIDI {}",
                    self.sample_rate,
                    self.block_size,
                    if self.has_midi_input() { "on" } else { "off" }
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start audio engine: {}", e);
                self.stop();
                Err(e)
            }
        }
    }

    fn try_start(&mut self) -> Result<(), EngineError> {
        let midi = self.open_midi();

        let request = OutputRequest {
            sample_rate: self.settings.audio.sample_rate,
            block_size: self.settings.audio.buffer_size.min(MAX_BLOCK_FRAMES as u32),
        };

        // The driver may call back while the stream is still being opened, so
        // the buffers must exist first
        let callback = AudioCallback::new(
            SampleBufferSet::new(MAX_BLOCK_FRAMES),
            midi,
            Arc::clone(&self.plugin),
            Arc::clone(&self.state),
            Arc::clone(&self.steady_time),
            self.clock,
            request.sample_rate as f64,
        );

        let stream = self
            .audio_backend
            .open_output(&self.settings.audio.device, &request, callback)?;
        self.block_size = stream.block_size();
        self.sample_rate = stream.sample_rate();
        let stream = self.stream.insert(stream);

        self.state
            .transition(EngineState::Stopped, EngineState::Running);
        {
            let mut plugin = self.plugin.lock();
            plugin.set_ports(CHANNELS, CHANNELS);
            plugin.activate(self.sample_rate as f64, self.block_size);
        }

        stream.play()
    }

    /// Open the MIDI port if one is configured. Failure is not fatal.
    fn open_midi(&mut self) -> Option<MidiConsumer> {
        let device = self.settings.midi.device.clone()?;
        let (producer, consumer) = midi_queue(MIDI_QUEUE_CAPACITY);

        match self.midi_backend.open_input(&device, producer, self.clock) {
            Ok(port) => {
                log::info!("MIDI input: {}", port.name());
                self.midi_in = Some(port);
                Some(consumer)
            }
            Err(e) if e.is_device_absent() => {
                log::info!("Running without MIDI input: {}", e);
                None
            }
            Err(e) => {
                log::warn!("Running without MIDI input: {}", e);
                None
            }
        }
    }

    /// Deactivate the plugin and close every device. Does nothing when the
    /// engine is already Stopped with nothing open.
    pub fn stop(&mut self) {
        if self.state() == EngineState::Stopped && self.stream.is_none() && self.midi_in.is_none() {
            return;
        }

        self.plugin.lock().deactivate();

        self.state
            .transition(EngineState::Running, EngineState::Stopping);

        // Dropping the stream frees the callback and its buffers
        self.stream.take();
        self.midi_in.take();

        self.state.force(EngineState::Stopped);
        log::info!(
            "Audio engine stopped after {} frames",
            self.steady_time()
        );
    }

    pub fn state(&self) -> EngineState {
        self.state.load()
    }

    pub fn steady_time(&self) -> u64 {
        self.steady_time.load(Ordering::Relaxed)
    }

    /// Block size the driver committed to on the last start
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn has_midi_input(&self) -> bool {
        self.midi_in.is_some()
    }

    /// Load a plugin and hand it the current parent window
    pub fn load_plugin<P: AsRef<Path>>(&mut self, path: P, index: u32) -> bool {
        let path = path.as_ref();
        let mut plugin = self.plugin.lock();
        if !plugin.load(path, index) {
            log::warn!("Failed to load plugin {} from {:?}", index, path);
            return false;
        }

        plugin.set_parent_window(self.parent_window);
        log::info!("Plugin {} loaded from {:?}", index, path);
        true
    }

    pub fn unload_plugin(&mut self) {
        self.plugin.lock().unload();
    }

    /// Applied to the plugin on the next successful [`Engine::load_plugin`]
    pub fn set_parent_window(&mut self, window: Option<ParentWindow>) {
        self.parent_window = window;
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Takes effect on the next start
    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
        self.unload_plugin();
    }
}
