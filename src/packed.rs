//! Storage and transfer representation of [`EncoderConfig`].
//!
//! At rest a record is 8 bytes:
//!
//! ```ignore
//! b0  switch action (4 bit)   | switch channel << 4
//! b1  switch number (7 bit)
//! b2  active color
//! b3  inactive color
//! b4  detent color (7 bit)    | has detent << 7
//! b5  indicator (2 bit)       | movement << 2 | shift channel << 4
//! b6  encoder MIDI type (3 bit) | encoder channel << 4
//! b7  encoder number (7 bit)  | super knob << 7
//! ```
//!
//! The configuration transfer protocol sends one 7 bit value per field, keyed
//! by a tag. Any value `>= 0x80` leaves the field unchanged. Encoder and
//! switch channels travel 1-based, the shift channel 0-based.

use crate::config::{EncoderConfig, EncoderMidiType, IndicatorType, Movement, SwitchAction};

/// Bytes per record.
pub const PACKED_SIZE: usize = 8;

/// Transfer value meaning "leave as is".
pub const UNCHANGED: u8 = 0x80;

/// First transfer tag.
pub const FIRST_TAG: u8 = 10;

/// Number of transfer tags, `FIRST_TAG..FIRST_TAG + TAG_COUNT`.
pub const TAG_COUNT: usize = 15;

pub fn pack(c: &EncoderConfig) -> [u8; PACKED_SIZE] {
    [
        (c.switch_action as u8 & 0x0F) | (c.switch_channel & 0x0F) << 4,
        c.switch_number & 0x7F,
        c.active_color,
        c.inactive_color,
        (c.detent_color & 0x7F) | (c.has_detent as u8) << 7,
        (c.indicator as u8 & 0x03) | (c.movement as u8 & 0x03) << 2 | (c.shift_channel & 0x0F) << 4,
        (c.encoder_type as u8 & 0x07) | (c.encoder_channel & 0x0F) << 4,
        (c.encoder_number & 0x7F) | (c.super_knob as u8) << 7,
    ]
}

pub fn unpack(b: &[u8; PACKED_SIZE]) -> EncoderConfig {
    EncoderConfig {
        switch_action: SwitchAction::from_u8(b[0] & 0x0F),
        switch_channel: b[0] >> 4,
        switch_number: b[1] & 0x7F,
        active_color: b[2],
        inactive_color: b[3],
        detent_color: b[4] & 0x7F,
        has_detent: b[4] & 0x80 != 0,
        indicator: IndicatorType::from_u8(b[5] & 0x03),
        movement: Movement::from_u8((b[5] >> 2) & 0x03),
        shift_channel: b[5] >> 4,
        encoder_type: EncoderMidiType::from_u8(b[6] & 0x07),
        encoder_channel: b[6] >> 4,
        encoder_number: b[7] & 0x7F,
        super_knob: b[7] & 0x80 != 0,
    }
}

/// A partial update of one record, as received by configuration transfer.
///
/// `None` fields are left unchanged by [`apply`](Self::apply).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigPatch {
    pub has_detent: Option<bool>,
    pub movement: Option<Movement>,
    pub switch_action: Option<SwitchAction>,
    /// 0-based.
    pub switch_channel: Option<u8>,
    pub switch_number: Option<u8>,
    /// 0-based.
    pub encoder_channel: Option<u8>,
    pub encoder_number: Option<u8>,
    pub encoder_type: Option<EncoderMidiType>,
    pub active_color: Option<u8>,
    pub inactive_color: Option<u8>,
    pub detent_color: Option<u8>,
    pub indicator: Option<IndicatorType>,
    pub super_knob: Option<bool>,
    pub shift_channel: Option<u8>,
}

fn present(v: u8) -> Option<u8> {
    if v < UNCHANGED {
        Some(v)
    } else {
        None
    }
}

// 1-based on the wire. A 0 can't be stored and is treated as absent.
fn channel(v: u8) -> Option<u8> {
    present(v).and_then(|v| v.checked_sub(1)).map(|v| v & 0x0F)
}

impl ConfigPatch {
    /// Build from transfer `(tag, value)` pairs. Unknown tags are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u8, u8)>) -> Self {
        let mut p = ConfigPatch::default();

        for (tag, value) in pairs {
            match tag {
                10 => p.has_detent = present(value).map(|v| v != 0),
                11 => p.movement = present(value).map(Movement::from_u8),
                12 => p.switch_action = present(value).map(SwitchAction::from_u8),
                13 => p.switch_channel = channel(value),
                14 => p.switch_number = present(value),
                // Switch MIDI type, kept for compatibility, never used.
                15 => {}
                16 => p.encoder_channel = channel(value),
                17 => p.encoder_number = present(value),
                18 => p.encoder_type = present(value).map(EncoderMidiType::from_u8),
                19 => p.active_color = present(value),
                20 => p.inactive_color = present(value),
                21 => p.detent_color = present(value),
                22 => p.indicator = present(value).map(IndicatorType::from_u8),
                23 => p.super_knob = present(value).map(|v| v != 0),
                24 => p.shift_channel = present(value).map(|v| v & 0x0F),
                _ => log::trace!("Ignore config tag: {}", tag),
            }
        }

        p
    }

    /// Same as [`from_pairs`](Self::from_pairs) with values given in tag order
    /// starting at [`FIRST_TAG`].
    pub fn from_values(values: &[u8]) -> Self {
        Self::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (FIRST_TAG + i as u8, *v)),
        )
    }

    pub fn is_empty(&self) -> bool {
        *self == ConfigPatch::default()
    }

    /// Merge into `config`, returning the result.
    pub fn apply(&self, config: &EncoderConfig) -> EncoderConfig {
        let mut c = *config;

        if let Some(v) = self.has_detent {
            c.has_detent = v;
        }
        if let Some(v) = self.movement {
            c.movement = v;
        }
        if let Some(v) = self.switch_action {
            c.switch_action = v;
        }
        if let Some(v) = self.switch_channel {
            c.switch_channel = v;
        }
        if let Some(v) = self.switch_number {
            c.switch_number = v;
        }
        if let Some(v) = self.encoder_channel {
            c.encoder_channel = v;
        }
        if let Some(v) = self.encoder_number {
            c.encoder_number = v;
        }
        if let Some(v) = self.encoder_type {
            c.encoder_type = v;
        }
        if let Some(v) = self.active_color {
            c.active_color = v;
        }
        if let Some(v) = self.inactive_color {
            c.inactive_color = v;
        }
        if let Some(v) = self.detent_color {
            c.detent_color = v;
        }
        if let Some(v) = self.indicator {
            c.indicator = v;
        }
        if let Some(v) = self.super_knob {
            c.super_knob = v;
        }
        if let Some(v) = self.shift_channel {
            c.shift_channel = v;
        }

        c.masked()
    }
}

/// The `(tag, value)` pairs describing `config` in a transfer response.
pub fn transfer_pairs(c: &EncoderConfig) -> [(u8, u8); TAG_COUNT] {
    let values = [
        c.has_detent as u8,
        c.movement as u8,
        c.switch_action as u8,
        (c.switch_channel & 0x0F) + 1,
        c.switch_number & 0x7F,
        0,
        (c.encoder_channel & 0x0F) + 1,
        c.encoder_number & 0x7F,
        c.encoder_type as u8,
        c.active_color & 0x7F,
        c.inactive_color & 0x7F,
        c.detent_color & 0x7F,
        c.indicator as u8,
        c.super_knob as u8,
        c.shift_channel & 0x0F,
    ];

    let mut pairs = [(0, 0); TAG_COUNT];
    for (i, v) in values.into_iter().enumerate() {
        pairs[i] = (FIRST_TAG + i as u8, v);
    }
    pairs
}
