//! Rotary movement policies.
//!
//! Each pass, an encoder that moved is routed to exactly one policy, checked
//! in this order:
//!
//! 1. Detent: the control has a center detent and the value sits inside it.
//! 2. Deadzone: absolute output and the value sits at either end of travel.
//! 3. Relative: relative output.
//! 4. Absolute: everything else.
//!
//! Values are kept in raw units, 100 per output step, so slow movement modes
//! can move less than one output step per click.

use crate::config::{EncoderConfig, Movement, Settings};
use crate::velocity::VelocityEstimator;

/// Largest raw value, output 127.
pub const RAW_MAX: i16 = 12700;

/// Raw values strictly between these are in the center detent.
pub const DETENT_LOW: i16 = 6240;
pub const DETENT_HIGH: i16 = 6450;

/// Where detent controls start and reset to.
pub const DETENT_CENTER: i16 = 6300;

/// Indicator shown while held in the detent.
pub const DETENT_INDICATOR: u8 = 63;

/// Where leaving either end of travel puts the value.
const DEADZONE_EXIT_LOW: i16 = 100;
const DEADZONE_EXIT_HIGH: i16 = 12600;

/// Raw units per step.
pub const MULTIPLIER_DIRECT: i16 = 100;
pub const MULTIPLIER_EMULATION: i16 = 178;
pub const MULTIPLIER_FINE: i16 = 25;

/// Bounds of the velocity sensitive multiplier in absolute mode.
pub const VELOCITY_MIN: u16 = 25;
pub const VELOCITY_MAX: u16 = 255;

/// Physical steps per relative tick while fine adjusting.
pub const RELATIVE_FINE_LIMIT: i16 = 4;

/// Relative "no change".
pub const RELATIVE_CENTER: u8 = 64;

/// Raw value to 7 bit output, rounding to nearest.
pub fn scale(raw: i16) -> u8 {
    let v = (raw.max(0) as i32 + 50) / 100;
    v.min(127) as u8
}

pub fn clamp_raw(raw: i32) -> i16 {
    raw.clamp(0, RAW_MAX as i32) as i16
}

pub fn in_detent(raw: i16) -> bool {
    raw > DETENT_LOW && raw < DETENT_HIGH
}

pub fn in_deadzone(raw: i16) -> bool {
    raw < 1 || raw > RAW_MAX - 1
}

/// Which policy handles a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Policy {
    Detent,
    Deadzone,
    Relative,
    Absolute,
}

impl Policy {
    pub fn select(cfg: &EncoderConfig, raw: i16) -> Self {
        let relative = cfg.encoder_type.is_relative();

        if cfg.has_detent && in_detent(raw) {
            Policy::Detent
        } else if !relative && in_deadzone(raw) {
            Policy::Deadzone
        } else if relative {
            Policy::Relative
        } else {
            Policy::Absolute
        }
    }
}

/// Per physical encoder state kept between passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotaryState {
    /// Steps taken while in the detent or a deadzone.
    pub hold: i16,
    /// Steps not yet sent while fine adjusting a relative control.
    pub fine: i16,
}

/// Movement of one encoder over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Motion {
    pub steps: i8,
    pub idle_cycles: u16,
    /// The switch is held and its action is fine adjust.
    pub fine: bool,
}

/// What a movement resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Nothing to send or show.
    None,
    /// Held in the detent.
    Pinned,
    /// New absolute output value.
    Absolute(u8),
    /// Relative output value, never [`RELATIVE_CENTER`].
    Relative(u8),
}

/// Applies the movement policies.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    pub settings: &'a Settings,
    pub velocity: &'a VelocityEstimator,
}

impl<'a> Classifier<'a> {
    pub fn new(settings: &'a Settings, velocity: &'a VelocityEstimator) -> Self {
        Classifier { settings, velocity }
    }

    /// Run one movement through the policy the control is in. `raw` is the
    /// value slot on display.
    pub fn classify(
        &self,
        state: &mut RotaryState,
        cfg: &EncoderConfig,
        raw: &mut i16,
        m: Motion,
    ) -> Outcome {
        if m.steps == 0 {
            return Outcome::None;
        }

        let outcome = match Policy::select(cfg, *raw) {
            Policy::Detent => self.detent(state, raw, m.steps),
            Policy::Deadzone => self.deadzone(state, raw, m.steps),
            Policy::Relative => self.relative(state, cfg, m),
            Policy::Absolute => self.absolute(cfg, raw, m),
        };

        debug_assert!(*raw >= 0 && *raw <= RAW_MAX);

        outcome
    }

    fn detent(&self, state: &mut RotaryState, raw: &mut i16, steps: i8) -> Outcome {
        let size = self.settings.detent_size;

        state.hold = state.hold.saturating_add(steps as i16);

        if state.hold > size {
            *raw = DETENT_HIGH;
        } else if state.hold < -size {
            *raw = DETENT_LOW;
        } else {
            return Outcome::Pinned;
        }

        state.hold = 0;
        Outcome::Absolute(scale(*raw))
    }

    fn deadzone(&self, state: &mut RotaryState, raw: &mut i16, steps: i8) -> Outcome {
        let size = self.settings.dead_zone_size;
        let at_low = *raw < DEADZONE_EXIT_LOW;
        let at_high = *raw > DEADZONE_EXIT_HIGH;

        // Only movement back into the range counts.
        if (at_low && steps > 0) || (at_high && steps < 0) {
            state.hold = state.hold.saturating_add(steps as i16);
        }

        if at_low && state.hold > size {
            *raw = DEADZONE_EXIT_LOW;
        } else if at_high && state.hold < -size {
            *raw = DEADZONE_EXIT_HIGH;
        } else {
            return Outcome::None;
        }

        state.hold = 0;
        Outcome::Absolute(scale(*raw))
    }

    fn relative(&self, state: &mut RotaryState, cfg: &EncoderConfig, m: Motion) -> Outcome {
        let value = if m.fine {
            state.fine += m.steps as i16;

            let mut value = RELATIVE_CENTER as i16;
            while state.fine >= RELATIVE_FINE_LIMIT {
                state.fine -= RELATIVE_FINE_LIMIT;
                value += 1;
            }
            while state.fine <= -RELATIVE_FINE_LIMIT {
                state.fine += RELATIVE_FINE_LIMIT;
                value -= 1;
            }
            value
        } else if cfg.movement == Movement::VelocitySensitive {
            let base = self.velocity.multiplier(m.steps.unsigned_abs(), m.idle_cycles);
            let scaled = 1 + ((base >> 4) & 0x1F) as i16;
            RELATIVE_CENTER as i16 + m.steps as i16 * scaled
        } else {
            RELATIVE_CENTER as i16 + m.steps as i16
        };

        let value = value.clamp(0, 127) as u8;

        if value == RELATIVE_CENTER {
            Outcome::None
        } else {
            Outcome::Relative(value)
        }
    }

    fn absolute(&self, cfg: &EncoderConfig, raw: &mut i16, m: Motion) -> Outcome {
        let multiplier = match cfg.movement {
            Movement::VelocitySensitive => {
                let base = self.velocity.multiplier(m.steps.unsigned_abs(), m.idle_cycles);
                if m.fine {
                    VELOCITY_MIN as i16
                } else {
                    base.clamp(VELOCITY_MIN, VELOCITY_MAX) as i16
                }
            }
            _ if m.fine => MULTIPLIER_FINE,
            Movement::Direct => MULTIPLIER_DIRECT,
            Movement::Emulation => MULTIPLIER_EMULATION,
        };

        *raw = clamp_raw(*raw as i32 + m.steps as i32 * multiplier as i32);

        Outcome::Absolute(scale(*raw))
    }
}
