//! Translation of queued MIDI messages into timed plugin events
//!
//! Runs inside the audio callback: draining is non-blocking and stops as soon
//! as the queue is empty.

use ringbuf::traits::*;

use super::events::*;
use crate::audio::callback::BlockContext;
use crate::audio::plugin::PluginHost;

/// Position inside the block at which a message received at `timestamp` is
/// deemed to occur.
///
/// The latency between capture and this callback, in samples, is counted back
/// from the end of the block. The delta is clamped to `frame_count - 1` so late
/// messages land at the start of the block, and the result is clamped into
/// `[0, frame_count - 1]`.
pub fn sample_offset(current_time: f64, timestamp: f64, frame_count: u32, sample_rate: f64) -> u32 {
    if frame_count == 0 {
        return 0;
    }
    let last = frame_count - 1;

    let delta_ms = (current_time - timestamp) * 1000.0;
    let delta_samples = delta_ms * sample_rate / 1000.0;
    // Negative (or NaN) deltas count as zero
    let delta_samples = if delta_samples > 0.0 {
        delta_samples.min(last as f64) as u32
    } else {
        0
    };

    (frame_count - delta_samples).min(last)
}

/// Decode one message. System and unknown event types are logged and return `None`.
pub fn translate(message: &MidiMessage, ctx: &BlockContext, sample_rate: f64) -> Option<TimedEvent> {
    let (data1, data2) = (message.data1, message.data2);
    let kind = match message.event_type() {
        STATUS_NOTE_ON => EventKind::NoteOn {
            key: data1,
            velocity: data2,
        },
        STATUS_NOTE_OFF => EventKind::NoteOff {
            key: data1,
            velocity: data2,
        },
        STATUS_CC => EventKind::ControlChange {
            controller: data1,
            value: data2,
        },
        STATUS_NOTE_AT => EventKind::NoteAftertouch {
            key: data1,
            pressure: data2,
        },
        STATUS_CHANNEL_AT => EventKind::ChannelAftertouch { pressure: data1 },
        STATUS_PITCH_BEND => EventKind::PitchBend {
            value: ((data2 as u16) << 7) | data1 as u16,
        },
        // Clock, active sensing and sysex arrive constantly; keep them quiet
        STATUS_SYSTEM => {
            log::trace!("system message dropped: 0x{:02X}", message.status);
            return None;
        }
        other => {
            log::warn!("unknown event type: {}", other);
            return None;
        }
    };

    Some(TimedEvent {
        sample_offset: sample_offset(ctx.current_time, message.timestamp, ctx.frame_count, sample_rate),
        channel: message.channel(),
        kind,
    })
}

/// Pop every pending message and dispatch it to the plugin in arrival order.
///
/// Returns the number of events the plugin received.
pub fn drain(
    consumer: &mut MidiConsumer,
    ctx: &BlockContext,
    sample_rate: f64,
    plugin: &mut dyn PluginHost,
) -> usize {
    let mut dispatched = 0;
    while let Some(message) = consumer.try_pop() {
        if let Some(event) = translate(&message, ctx, sample_rate) {
            if event.dispatch(plugin) {
                dispatched += 1;
            }
        }
    }
    dispatched
}
