//! MIDI message and timed plugin event types
//!
//! Raw messages travel from the MIDI driver thread to the audio thread through
//! a lock-free ring buffer. The producer is owned by the driver callback and
//! the consumer by the audio callback, so neither side ever takes a lock.

use ringbuf::{traits::*, HeapRb};

use crate::audio::plugin::PluginHost;

/// Capacity of the MIDI input queue in messages
pub const MIDI_QUEUE_CAPACITY: usize = 512;

/// Status nibbles understood by the translator
pub const STATUS_NOTE_OFF: u8 = 0x8;
pub const STATUS_NOTE_ON: u8 = 0x9;
pub const STATUS_NOTE_AT: u8 = 0xA;
pub const STATUS_CC: u8 = 0xB;
pub const STATUS_CHANNEL_AT: u8 = 0xD;
pub const STATUS_PITCH_BEND: u8 = 0xE;
/// System common and real-time messages (sysex, clock, active sensing)
pub const STATUS_SYSTEM: u8 = 0xF;

/// A raw channel message with the engine-clock time it was received
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    /// Engine-clock seconds
    pub timestamp: f64,
}

impl MidiMessage {
    pub fn new(status: u8, data1: u8, data2: u8, timestamp: f64) -> Self {
        Self {
            status,
            data1,
            data2,
            timestamp,
        }
    }

    /// Build from driver bytes; missing data bytes read as zero
    pub fn from_bytes(bytes: &[u8], timestamp: f64) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        Some(Self {
            status,
            data1: data.first().copied().unwrap_or(0),
            data2: data.get(1).copied().unwrap_or(0),
            timestamp,
        })
    }

    /// High nibble of the status byte
    #[inline]
    pub fn event_type(&self) -> u8 {
        self.status >> 4
    }

    /// Low nibble of the status byte
    #[inline]
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

/// Plugin-facing event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8, velocity: u8 },
    NoteAftertouch { key: u8, pressure: u8 },
    ControlChange { controller: u8, value: u8 },
    ChannelAftertouch { pressure: u8 },
    /// 14-bit value, 0..=0x3FFF
    PitchBend { value: u16 },
}

/// An event placed at a sample position inside the current block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub sample_offset: u32,
    /// MIDI channel (0-15)
    pub channel: u8,
    pub kind: EventKind,
}

impl TimedEvent {
    /// Forward the event to the matching plugin entry point.
    ///
    /// Returns false for events the plugin is not sent. Channel aftertouch
    /// has no entry point in the plugin contract and is only logged.
    pub fn dispatch(&self, plugin: &mut dyn PluginHost) -> bool {
        let (offset, channel) = (self.sample_offset, self.channel);
        match self.kind {
            EventKind::NoteOn { key, velocity } => {
                plugin.process_note_on(offset, channel, key, velocity)
            }
            EventKind::NoteOff { key, velocity } => {
                plugin.process_note_off(offset, channel, key, velocity)
            }
            EventKind::NoteAftertouch { key, pressure } => {
                log::debug!("Note AT key: {}, pres: {}", key, pressure);
                plugin.process_note_at(offset, channel, key, pressure)
            }
            EventKind::ControlChange { controller, value } => {
                plugin.process_cc(offset, channel, controller, value)
            }
            EventKind::ChannelAftertouch { pressure } => {
                log::debug!("Channel after touch: ch={}, pres={}", channel, pressure);
                return false;
            }
            EventKind::PitchBend { value } => plugin.process_pitch_bend(offset, channel, value),
        }
        true
    }
}

pub type MidiProducer = ringbuf::HeapProd<MidiMessage>;
pub type MidiConsumer = ringbuf::HeapCons<MidiMessage>;

/// Create the queue connecting a MIDI port to the audio callback
pub fn midi_queue(capacity: usize) -> (MidiProducer, MidiConsumer) {
    HeapRb::new(capacity).split()
}

/// Push from the driver side; a full queue drops the message
#[inline]
pub fn push_message(producer: &mut MidiProducer, message: MidiMessage) -> bool {
    if producer.try_push(message).is_ok() {
        return true;
    }
    log::debug!("MIDI queue full, message dropped: status=0x{:02X}", message.status);
    false
}
