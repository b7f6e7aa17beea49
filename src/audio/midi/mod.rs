//! MIDI input for the plugin
//!
//! Device input, the lock-free message queue, and translation of raw messages
//! into timed plugin events.

mod device;
mod events;
pub mod translate;

pub use device::{MidiBackend, MidiPort, MidirBackend, MIDI_API};
pub use events::{
    midi_queue, push_message, EventKind, MidiConsumer, MidiMessage, MidiProducer, TimedEvent,
    MIDI_QUEUE_CAPACITY,
};
