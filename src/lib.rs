// For tests we use std.
#![cfg_attr(not(test), no_std)]

mod address;
mod bitfield;
mod classifier;
mod config;
mod controller;
mod debounce;
mod encoder;
mod error;
mod feedback;
mod input;
mod midi;
mod packed;
mod scan;
mod switch;
mod velocity;

pub use address::{banked_id, virtual_id, Bank, BankedEncoderId, PhysicalEncoder, VirtualEncoderId};
pub use address::{BANKED_ENCODERS, NUM_BANKS, PHYSICAL_ENCODERS, VIRTUAL_ENCODERS};
pub use bitfield::Bitfield;
pub use classifier::{scale, Classifier, Motion, Outcome, Policy, RotaryState};
pub use classifier::{DETENT_CENTER, DETENT_HIGH, DETENT_INDICATOR, DETENT_LOW, RAW_MAX};
pub use config::{factory_defaults, ConfigStore, DuplicateMappingPolicy, EncoderConfig};
pub use config::{EncoderMidiType, IndicatorType, Movement, Settings, SwitchAction};
pub use controller::{BankBuffer, Controller, SHIFT_OFFSET, SHIFT_PAGES};
pub use debounce::{SwitchDebouncer, SwitchEdges};
pub use encoder::QuadratureDecoder;
pub use error::Error;
pub use feedback::{InboundKind, ENCODER_ANIMATION_CHANNEL, SWITCH_ANIMATION_CHANNEL};
pub use input::{RawSample, SampleSource};
pub use midi::{cc, note, super_knob_value, MidiOut, NOTE_VELOCITY};
pub use packed::{pack, transfer_pairs, unpack, ConfigPatch, PACKED_SIZE, UNCHANGED};
pub use scan::{ScanSnapshot, Scanner, SharedScanner};
pub use switch::SWITCH_ON;
pub use velocity::{VelocityCalibration, VelocityEstimator};

#[cfg(test)]
mod scenario;
