//! Outbound MIDI.
//!
//! Everything the controller sends goes through a [`MidiOut`]. Sending is
//! fire and forget, a full queue drops the message.

use heapless::Deque;
#[allow(unused_imports)]
use micromath::F32Ext;
use midi_types::{Channel, Control, MidiMessage, Note, Value7};

use crate::config::{EncoderConfig, EncoderMidiType};

/// Velocity of notes sent by note type encoders.
pub const NOTE_VELOCITY: u8 = 127;

/// Sink for outbound messages, typically the transport's queue.
pub trait MidiOut {
    fn send(&mut self, msg: MidiMessage);

    /// Control change. All arguments are masked to their field width.
    fn send_cc(&mut self, channel: u8, number: u8, value: u8) {
        self.send(cc(channel, number, value));
    }

    /// Note on, or note off when `on` is false.
    fn send_note(&mut self, channel: u8, number: u8, on: bool, velocity: u8) {
        self.send(note(channel, number, on, velocity));
    }
}

impl<const N: usize> MidiOut for Deque<MidiMessage, N> {
    fn send(&mut self, msg: MidiMessage) {
        if let Err(msg) = self.push_back(msg) {
            log::warn!("MIDI out queue full, drop: {:?}", msg);
        }
    }
}

impl<M: MidiOut + ?Sized> MidiOut for &mut M {
    fn send(&mut self, msg: MidiMessage) {
        (**self).send(msg)
    }
}

pub fn cc(channel: u8, number: u8, value: u8) -> MidiMessage {
    MidiMessage::ControlChange(
        Channel::new(channel & 0x0F),
        Control::new(number & 0x7F),
        Value7::new(value & 0x7F),
    )
}

pub fn note(channel: u8, number: u8, on: bool, velocity: u8) -> MidiMessage {
    let channel = Channel::new(channel & 0x0F);
    let n = Note::from(number & 0x7F);
    let v = Value7::new(velocity & 0x7F);

    if on {
        MidiMessage::NoteOn(channel, n, v)
    } else {
        MidiMessage::NoteOff(channel, n, v)
    }
}

/// The secondary output of a super knob.
///
/// Zero below `start`, rising linearly to 127 at `end`.
pub fn super_knob_value(value: u8, start: u8, end: u8) -> u8 {
    if value < start {
        return 0;
    }

    if end <= start {
        return 127;
    }

    let v = (value - start) as f32 * 127.0 / (end - start) as f32;

    v.round().min(127.0) as u8
}

/// Send the absolute value of a rotary.
///
/// `shifted` selects the shift channel. CC types also send the super knob
/// output at `number + 64`. Note types send a note on at
/// [`NOTE_VELOCITY`] for any non-zero value and a note off at 0. Relative
/// types send nothing here, see [`send_relative`].
pub fn send_encoder<M: MidiOut>(
    out: &mut M,
    cfg: &EncoderConfig,
    value: u8,
    shifted: bool,
    super_knob: (u8, u8),
) {
    let channel = encoder_channel(cfg, shifted);

    if cfg.encoder_type.is_cc() {
        out.send_cc(channel, cfg.encoder_number, value);

        if cfg.super_knob {
            let (start, end) = super_knob;
            let secondary = super_knob_value(value, start, end);
            out.send_cc(channel, cfg.encoder_number.wrapping_add(64), secondary);
        }
    } else if cfg.encoder_type == EncoderMidiType::Note {
        // Fixed velocity, the value only decides on or off.
        let on = value > 0;
        out.send_note(channel, cfg.encoder_number, on, if on { NOTE_VELOCITY } else { 0 });
    }
}

/// Send a relative change, `64 + delta`. A zero delta sends nothing.
pub fn send_relative<M: MidiOut>(out: &mut M, cfg: &EncoderConfig, value: u8, shifted: bool) {
    if value == 64 {
        return;
    }
    out.send_cc(encoder_channel(cfg, shifted), cfg.encoder_number, value);
}

/// Send a switch value on the switch's own channel and number. `on` selects
/// note on/off for note actions.
pub fn send_switch<M: MidiOut>(out: &mut M, cfg: &EncoderConfig, value: u8, on: bool) {
    if cfg.switch_action.is_note() {
        out.send_note(cfg.switch_channel, cfg.switch_number, on, value);
    } else {
        out.send_cc(cfg.switch_channel, cfg.switch_number, value);
    }
}

fn encoder_channel(cfg: &EncoderConfig, shifted: bool) -> u8 {
    if shifted {
        cfg.shift_channel
    } else {
        cfg.encoder_channel
    }
}
