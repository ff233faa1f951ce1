//! Inbound MIDI feedback.
//!
//! A host echoing values back to the device updates what the device shows,
//! never what it sends. Nothing in here takes a [`MidiOut`](crate::MidiOut),
//! so feedback can't loop.

use midi_types::MidiMessage;

use crate::address::{Bank, BankedEncoderId, PhysicalEncoder, NUM_BANKS, PHYSICAL_ENCODERS};
use crate::classifier::RAW_MAX;
use crate::config::{DuplicateMappingPolicy, EncoderConfig, EncoderMidiType};
use crate::controller::{Controller, SHIFT_OFFSET, SHIFT_PAGES};

/// Channel of encoder indicator animations, matched on switch number.
pub const ENCODER_ANIMATION_CHANNEL: u8 = 2;

/// Channel of switch color animations, matched on switch number.
pub const SWITCH_ANIMATION_CHANNEL: u8 = 5;

/// Kind of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InboundKind {
    Cc,
    NoteOn,
    NoteOff,
}

impl Controller {
    /// Apply an inbound message from the host.
    ///
    /// Channel, number and value are masked to their field width.
    pub fn on_inbound(&mut self, channel: u8, kind: InboundKind, number: u8, value: u8) {
        let channel = channel & 0x0F;
        let number = number & 0x7F;
        let value = value & 0x7F;

        if channel == self.settings.system_channel {
            self.on_system(kind, number, value);
            return;
        }

        let mut matched = false;

        for id in BankedEncoderId::all() {
            if self.on_mapping(id, channel, kind, number, value) {
                matched = true;

                if self.settings.duplicate_mapping == DuplicateMappingPolicy::FirstMatch {
                    break;
                }
            }
        }

        if !matched {
            log::trace!("No mapping for ch {} number {}", channel, number);
        }
    }

    /// [`on_inbound`](Self::on_inbound) for a parsed message. Other message
    /// types are ignored.
    pub fn on_message(&mut self, msg: &MidiMessage) {
        match *msg {
            MidiMessage::ControlChange(ch, control, value) => {
                self.on_inbound(ch.into(), InboundKind::Cc, control.into(), value.into())
            }
            MidiMessage::NoteOn(ch, note, velocity) => {
                self.on_inbound(ch.into(), InboundKind::NoteOn, note.into(), velocity.into())
            }
            MidiMessage::NoteOff(ch, note, velocity) => {
                self.on_inbound(ch.into(), InboundKind::NoteOff, note.into(), velocity.into())
            }
            _ => {}
        }
    }

    // Returns whether the message applied to this record.
    fn on_mapping(
        &mut self,
        id: BankedEncoderId,
        channel: u8,
        kind: InboundKind,
        number: u8,
        value: u8,
    ) -> bool {
        let cfg = self.configs[id.index()];
        let (bank, enc) = (id.bank(), id.encoder());
        let mut applied = false;

        if cfg.encoder_number == number && accepts_encoder(&cfg, kind) {
            if cfg.encoder_channel == channel {
                self.indicator_feedback(id, value, false);
                applied = true;
            } else if cfg.shift_channel == channel {
                self.indicator_feedback(id, value, true);
                applied = true;
            }
        }

        if cfg.switch_number == number {
            if cfg.switch_channel == channel {
                let value = match (cfg.switch_action.is_note(), kind) {
                    (true, InboundKind::NoteOn) => Some(value),
                    (true, InboundKind::NoteOff) => Some(0),
                    (false, InboundKind::Cc) => Some(value),
                    _ => None,
                };

                if let Some(value) = value {
                    self.color_feedback(bank, enc, value);
                    self.switch_state[bank.index()][enc.index()] = if value > 0 { 127 } else { 0 };
                    applied = true;
                }
            } else if channel == ENCODER_ANIMATION_CHANNEL {
                self.encoder_animation[bank.index()][enc.index()] = value;
                applied = true;
            } else if channel == SWITCH_ANIMATION_CHANNEL {
                self.switch_animation[bank.index()][enc.index()] = value;
                applied = true;
            }
        }

        applied
    }

    fn indicator_feedback(&mut self, id: BankedEncoderId, value: u8, shifted: bool) {
        let (bank, enc) = (id.bank(), id.encoder());
        let cfg = &self.configs[id.index()];

        // Don't fight a knob that is being turned.
        let turning = bank == self.bank && self.active & enc.bit() != 0;
        if turning && !cfg.encoder_type.is_relative() {
            return;
        }

        self.raw[id.virtual_id(shifted).index()] = (value as i16 * 100).min(RAW_MAX);

        if self.is_shifted(bank, enc) == shifted {
            self.indicator[bank.index()][enc.index()] = value;
        }
    }

    fn color_feedback(&mut self, bank: Bank, enc: PhysicalEncoder, value: u8) {
        let cfg = &self.configs[BankedEncoderId::new(bank, enc).index()];
        let bit = enc.index() as u8;

        let color = match value {
            0 => {
                self.color_override[bank.index()].set(bit, false);
                cfg.inactive_color
            }
            // 126 and 127 would be white, which is reserved.
            1..=125 => {
                self.color_override[bank.index()].set(bit, true);
                value
            }
            _ => {
                self.color_override[bank.index()].set(bit, true);
                cfg.active_color
            }
        };

        self.color[bank.index()][enc.index()] = color;
    }

    fn on_system(&mut self, kind: InboundKind, number: u8, value: u8) {
        let pages = SHIFT_OFFSET..SHIFT_OFFSET + (SHIFT_PAGES * PHYSICAL_ENCODERS) as u8;

        if kind != InboundKind::Cc && pages.contains(&number) {
            let n = number - SHIFT_OFFSET;
            let page = n as usize / PHYSICAL_ENCODERS;
            let bit = n % PHYSICAL_ENCODERS as u8;
            let on = kind == InboundKind::NoteOn && value > 0;

            self.shift_page_override[page].set(bit, true);
            self.shift_page[page].set(bit, on);
            return;
        }

        let selects_bank = kind != InboundKind::NoteOff && value == 127 && (number as usize) < NUM_BANKS;

        if selects_bank {
            self.change_bank(Bank::from_masked(number));
            return;
        }

        log::trace!("Unhandled system message {:?} {} {}", kind, number, value);
    }
}

fn accepts_encoder(cfg: &EncoderConfig, kind: InboundKind) -> bool {
    match kind {
        InboundKind::Cc => cfg.encoder_type.is_cc() || cfg.encoder_type.is_relative(),
        InboundKind::NoteOn | InboundKind::NoteOff => cfg.encoder_type == EncoderMidiType::Note,
    }
}
