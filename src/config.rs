//! Per control configuration and runtime settings.

use crate::address::{Bank, BankedEncoderId, PhysicalEncoder, BANKED_ENCODERS, NUM_BANKS};
use crate::velocity::VelocityCalibration;

/// What the rotary sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderMidiType {
    Note = 0,
    #[default]
    Cc = 1,
    /// Binary offset relative CC, 64 is "no change".
    Relative = 2,
    /// Like [`Cc`](Self::Cc), but the switch press sends the rotary value.
    CcSwitchVelocity = 3,
    RelativeMouseDrag = 4,
    RelativeMouseScroll = 5,
}

impl EncoderMidiType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Note,
            1 => Self::Cc,
            2 => Self::Relative,
            3 => Self::CcSwitchVelocity,
            4 => Self::RelativeMouseDrag,
            5 => Self::RelativeMouseScroll,
            _ => {
                log::warn!("Unknown encoder MIDI type: {}", v);
                Self::default()
            }
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(
            self,
            Self::Relative | Self::RelativeMouseDrag | Self::RelativeMouseScroll
        )
    }

    /// Absolute CC output, possibly with a super knob.
    pub fn is_cc(&self) -> bool {
        matches!(self, Self::Cc | Self::CcSwitchVelocity)
    }
}

/// Sensitivity of the absolute rotary modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Movement {
    /// One output step per detent click.
    #[default]
    Direct = 0,
    /// Full range in roughly 270 degrees.
    Emulation = 1,
    VelocitySensitive = 2,
}

impl Movement {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Direct,
            1 => Self::Emulation,
            2 => Self::VelocitySensitive,
            _ => {
                log::warn!("Unknown movement: {}", v);
                Self::default()
            }
        }
    }
}

/// What pushing the knob does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchAction {
    #[default]
    CcHold = 0,
    CcToggle = 1,
    NoteHold = 2,
    NoteToggle = 3,
    ResetValue = 4,
    FineAdjust = 5,
    ShiftHold = 6,
    ShiftToggle = 7,
}

impl SwitchAction {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::CcHold,
            1 => Self::CcToggle,
            2 => Self::NoteHold,
            3 => Self::NoteToggle,
            4 => Self::ResetValue,
            5 => Self::FineAdjust,
            6 => Self::ShiftHold,
            7 => Self::ShiftToggle,
            _ => {
                log::warn!("Unknown switch action: {}", v);
                Self::default()
            }
        }
    }

    /// Switch output is a note rather than a CC.
    pub fn is_note(&self) -> bool {
        matches!(self, Self::NoteHold | Self::NoteToggle)
    }
}

/// How the display draws the indicator ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorType {
    Dot = 0,
    Bar = 1,
    #[default]
    BlendedBar = 2,
    BlendedDot = 3,
}

impl IndicatorType {
    /// Two bits, every value is valid.
    pub fn from_u8(v: u8) -> Self {
        match v & 0x03 {
            0 => Self::Dot,
            1 => Self::Bar,
            2 => Self::BlendedBar,
            _ => Self::BlendedDot,
        }
    }
}

/// Mapping and behaviour of one control in one bank.
///
/// Channels are 0-based, numbers and colors are 7 bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderConfig {
    pub has_detent: bool,
    pub movement: Movement,
    pub switch_action: SwitchAction,
    pub switch_channel: u8,
    pub switch_number: u8,
    pub encoder_type: EncoderMidiType,
    pub encoder_channel: u8,
    pub encoder_number: u8,
    /// Channel used for the rotary while shifted. Same number as unshifted.
    pub shift_channel: u8,
    pub active_color: u8,
    pub inactive_color: u8,
    pub detent_color: u8,
    pub indicator: IndicatorType,
    pub super_knob: bool,
}

const ACTIVE_COLORS: [u8; NUM_BANKS] = [25, 81, 25, 25];
const INACTIVE_COLORS: [u8; NUM_BANKS] = [113, 63, 100, 0];

impl EncoderConfig {
    /// Factory setting for one control. Every control gets its own encoder and
    /// switch number, the banked index.
    pub fn factory(id: BankedEncoderId) -> Self {
        let bank = id.bank().index();
        let number = id.index() as u8;

        EncoderConfig {
            has_detent: false,
            movement: Movement::Direct,
            switch_action: SwitchAction::CcHold,
            switch_channel: 1,
            switch_number: number,
            encoder_type: EncoderMidiType::Cc,
            encoder_channel: 0,
            encoder_number: number,
            shift_channel: 4,
            active_color: ACTIVE_COLORS[bank],
            inactive_color: INACTIVE_COLORS[bank],
            detent_color: 63,
            indicator: IndicatorType::BlendedBar,
            super_knob: false,
        }
    }

    /// Whether the value memory of two controls should be kept in step on bank
    /// change. Channels are compared separately per shift side.
    pub fn maps_match(&self, other: &EncoderConfig) -> bool {
        self.encoder_number == other.encoder_number
            && self.encoder_type == other.encoder_type
            && !self.encoder_type.is_relative()
    }

    /// Force all channel/number/color fields into their bit width.
    pub fn masked(mut self) -> Self {
        self.switch_channel &= 0x0F;
        self.encoder_channel &= 0x0F;
        self.shift_channel &= 0x0F;
        self.switch_number &= 0x7F;
        self.encoder_number &= 0x7F;
        self.active_color &= 0x7F;
        self.inactive_color &= 0x7F;
        self.detent_color &= 0x7F;
        self
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::factory(BankedEncoderId::from_masked(0))
    }
}

/// The 64 factory records, in banked order.
pub fn factory_defaults() -> [EncoderConfig; BANKED_ENCODERS] {
    let mut configs = [EncoderConfig::default(); BANKED_ENCODERS];
    for id in BankedEncoderId::all() {
        configs[id.index()] = EncoderConfig::factory(id);
    }
    configs
}

/// What to do when more than one record matches an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DuplicateMappingPolicy {
    /// Stop at the first record the message was applied to.
    FirstMatch,
    /// Apply to every matching record. Lets a "master" control share one
    /// mapping across banks.
    #[default]
    AllMatches,
}

/// Device wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// 0-based channel reserved for the fixed system mapping.
    pub system_channel: u8,
    /// Primary value where the super knob secondary output starts rising.
    pub super_knob_start: u8,
    /// Primary value where the secondary output reaches 127.
    pub super_knob_end: u8,
    /// Steps needed to leave the center detent.
    pub detent_size: i16,
    /// Steps needed to leave either end of travel.
    pub dead_zone_size: i16,
    pub duplicate_mapping: DuplicateMappingPolicy,
    pub velocity: VelocityCalibration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            system_channel: 3,
            super_knob_start: 63,
            super_knob_end: 127,
            detent_size: 8,
            dead_zone_size: 2,
            duplicate_mapping: DuplicateMappingPolicy::AllMatches,
            velocity: VelocityCalibration::default(),
        }
    }
}

/// Persistent storage of the per control records.
pub trait ConfigStore {
    type Error;

    fn load(&mut self, bank: Bank, encoder: PhysicalEncoder) -> Result<EncoderConfig, Self::Error>;

    fn save(
        &mut self,
        bank: Bank,
        encoder: PhysicalEncoder,
        config: &EncoderConfig,
    ) -> Result<(), Self::Error>;
}
