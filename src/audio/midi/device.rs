//! MIDI device input handling
//!
//! Opens a MIDI input port selected by API name and index. Each received
//! message is stamped with the engine clock and pushed onto the queue the
//! audio callback drains.

use midir::{Ignore, MidiInput, MidiInputConnection};

use super::events::{push_message, MidiMessage, MidiProducer};
use crate::audio::clock::EngineClock;
use crate::audio::device::DeviceInfo;
use crate::audio::error::{DeviceKind, EngineError};
use crate::audio::settings::DeviceReference;

/// Client name registered with the MIDI subsystem
const CLIENT_NAME: &str = "clap-host";

/// Name of the MIDI API midir was compiled against on this platform
#[cfg(target_os = "linux")]
pub const MIDI_API: &str = "alsa";
#[cfg(target_os = "macos")]
pub const MIDI_API: &str = "coremidi";
#[cfg(target_os = "windows")]
pub const MIDI_API: &str = "winmm";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const MIDI_API: &str = "";

/// An open MIDI input port. Dropping it closes the port.
pub trait MidiPort {
    fn name(&self) -> &str;
}

/// Opens MIDI input ports for the engine
pub trait MidiBackend {
    fn open_input(
        &mut self,
        device: &DeviceReference,
        producer: MidiProducer,
        clock: EngineClock,
    ) -> Result<Box<dyn MidiPort>, EngineError>;
}

/// midir-backed MIDI input
#[derive(Debug, Default)]
pub struct MidirBackend;

impl MidirBackend {
    pub fn new() -> Self {
        Self
    }

    /// List available MIDI input ports
    pub fn list_ports() -> Result<Vec<DeviceInfo>, EngineError> {
        let midi_in =
            MidiInput::new("clap-host-enumerate").map_err(|e| EngineError::Midi(e.to_string()))?;

        let ports = midi_in.ports();
        let mut devices = Vec::with_capacity(ports.len());
        for (index, port) in ports.iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {}", index));
            devices.push(DeviceInfo {
                index,
                name,
                is_default: index == 0,
            });
        }

        Ok(devices)
    }

    fn check_api(api: &str) -> Result<(), EngineError> {
        if api.is_empty() || api.eq_ignore_ascii_case(MIDI_API) {
            Ok(())
        } else {
            Err(EngineError::UnsupportedApi {
                kind: DeviceKind::Midi,
                api: api.to_string(),
            })
        }
    }
}

impl MidiBackend for MidirBackend {
    fn open_input(
        &mut self,
        device: &DeviceReference,
        mut producer: MidiProducer,
        clock: EngineClock,
    ) -> Result<Box<dyn MidiPort>, EngineError> {
        Self::check_api(&device.api)?;

        let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| EngineError::Midi(e.to_string()))?;
        // Deliver sysex, timing and active sensing too; the translator decides what to keep
        midi_in.ignore(Ignore::None);

        let index = device.index.unwrap_or(0);
        let ports = midi_in.ports();
        let port = ports.get(index).ok_or(EngineError::DeviceNotFound {
            kind: DeviceKind::Midi,
            index,
        })?;

        let name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", index));

        log::info!("Connecting to MIDI device: {}", name);

        let connection = midi_in
            .connect(
                port,
                "clap-host-midi-in",
                move |_stamp, bytes, _| {
                    if let Some(message) = MidiMessage::from_bytes(bytes, clock.now_secs()) {
                        push_message(&mut producer, message);
                    }
                },
                (),
            )
            .map_err(|e| EngineError::Midi(format!("failed to connect to {}: {}", name, e)))?;

        log::info!("Successfully connected to MIDI device: {}", name);
        Ok(Box::new(MidirPort {
            _connection: connection,
            name,
        }))
    }
}

struct MidirPort {
    /// Keeps the port open; dropping it closes the connection
    _connection: MidiInputConnection<()>,
    name: String,
}

impl MidiPort for MidirPort {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MidirPort {
    fn drop(&mut self) {
        log::info!("Disconnecting from MIDI device: {}", self.name);
    }
}
