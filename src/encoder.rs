//! Quadrature decoding of the 16 twiddly knobs.
//!
//! Each encoder gives us two pins, `A` and `B`, in "quadrature".
//!
//! ```ignore
//!    +----+    +----+
//!    |    |    |    |       A
//!  --+    +----+    +----
//!       +----+    +----+
//!       |    |    |    |    B
//!   ----+    +----+    +--
//!        ^  ^ ^  ^
//!        1  2 3  4
//! ```
//!
//! Every scan we compare the previous `AB` with the current `AB`. Putting the
//! four bits together as `prev_a prev_b a b` gives a key into a 16 entry
//! table. Exactly one pin changing is a step in some direction, no pin
//! changing is idle, and both pins changing at once means we missed a sample
//! and can't tell which way it went.
//!
//! On top of that sits a direction latch. Cheap mechanical contacts bounce,
//! and a bounce looks like a single step backwards in the middle of a turn.
//! A step against the latched direction is only believed if the encoder has
//! been quiet for [`DEBOUNCE_CYCLE_TIMEOUT`] scans. A rejected step still
//! moves the latch, so a real reversal only loses its first step.

use crate::address::{PhysicalEncoder, PHYSICAL_ENCODERS};

/// Sentinel for "both pins changed".
pub const AMBIGUOUS: i8 = 127;

const TABLE: [i8; 16] = [
    0,          // 0000
    -1,         // 0001
    1,          // 0010
    AMBIGUOUS,  // 0011
    1,          // 0100
    0,          // 0101
    AMBIGUOUS,  // 0110
    -1,         // 0111
    -1,         // 1000
    AMBIGUOUS,  // 1001
    0,          // 1010
    1,          // 1011
    AMBIGUOUS,  // 1100
    1,          // 1101
    -1,         // 1110
    0,          // 1111
];

/// A direction change is accepted without confirmation after this many quiet
/// scans (roughly milliseconds).
pub const DEBOUNCE_CYCLE_TIMEOUT: u16 = 6;

/// Idle counter saturates here.
pub const IDLE_CEILING: u8 = 255;

/// An encoder idle for this many scans is no longer being turned.
pub const INACTIVE_THRESHOLD: u8 = 100;

/// Result of a single scan for one encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Idle,
    Ambiguous,
    Forward,
    Backward,
}

impl Transition {
    /// Look up the transition from the previous and current pin states.
    pub fn decode(prev_a: bool, prev_b: bool, a: bool, b: bool) -> Self {
        let key = (prev_a as usize) << 3 | (prev_b as usize) << 2 | (a as usize) << 1 | b as usize;

        match TABLE[key] {
            1 => Transition::Forward,
            -1 => Transition::Backward,
            AMBIGUOUS => Transition::Ambiguous,
            _ => Transition::Idle,
        }
    }

    fn direction(&self) -> i8 {
        match self {
            Transition::Forward => 1,
            Transition::Backward => -1,
            _ => 0,
        }
    }
}

/// Per encoder state kept between scans.
#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    /// Net accepted steps since last taken.
    steps: i8,
    /// Scans since the last directional event.
    idle: u8,
    /// Last seen direction, -1, 0 or 1.
    latch: i8,
    /// Sum of `idle + 1` over accepted steps since last taken.
    cycle_sum: u16,
}

/// Decoder for all 16 encoders, driven by [`scan`](Self::scan) once per scan period.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    prev_a: u16,
    prev_b: u16,
    channels: [Channel; PHYSICAL_ENCODERS],
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureDecoder {
    pub const fn new() -> Self {
        QuadratureDecoder {
            prev_a: 0,
            prev_b: 0,
            channels: [Channel {
                steps: 0,
                idle: 0,
                latch: 0,
                cycle_sum: 0,
            }; PHYSICAL_ENCODERS],
        }
    }

    /// Feed one sample of both phase bitmasks.
    pub fn scan(&mut self, channel_a: u16, channel_b: u16) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            let bit = 1 << i;

            let t = Transition::decode(
                self.prev_a & bit != 0,
                self.prev_b & bit != 0,
                channel_a & bit != 0,
                channel_b & bit != 0,
            );

            let direction = t.direction();

            if direction == 0 {
                if ch.idle < IDLE_CEILING {
                    ch.idle += 1;
                }
                continue;
            }

            let cycles = ch.idle as u16 + 1;

            if cycles >= DEBOUNCE_CYCLE_TIMEOUT || direction == ch.latch {
                ch.steps = ch.steps.saturating_add(direction);
                ch.cycle_sum = ch.cycle_sum.saturating_add(cycles);
            }

            // Rejected or not, this primes the next step in the same direction.
            ch.latch = direction;
            ch.idle = 0;
        }

        self.prev_a = channel_a;
        self.prev_b = channel_b;
    }

    /// Net steps since last call, resetting the accumulator.
    pub fn take_steps(&mut self, id: PhysicalEncoder) -> i8 {
        core::mem::take(&mut self.channels[id.index()].steps)
    }

    /// Idle cycles summed over the accepted steps since last call, resetting the sum.
    /// Together with the step count this is a measure of rotation speed.
    pub fn take_idle_cycle_sum(&mut self, id: PhysicalEncoder) -> u16 {
        core::mem::take(&mut self.channels[id.index()].cycle_sum)
    }

    /// Whether the encoder has moved within the last [`INACTIVE_THRESHOLD`] scans.
    pub fn is_active(&self, id: PhysicalEncoder) -> bool {
        self.channels[id.index()].idle < INACTIVE_THRESHOLD
    }

    /// Bitmask of [`is_active`](Self::is_active) for all encoders.
    pub fn active_mask(&self) -> u16 {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| ch.idle < INACTIVE_THRESHOLD)
            .fold(0, |m, (i, _)| m | 1 << i)
    }
}
