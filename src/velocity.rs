//! Rotation speed to value multiplier.
//!
//! Speed is measured in ticks per scan: accepted steps divided by the idle
//! scans summed over those steps. The multiplier is linear in that speed
//! between two calibration points and saturates outside them.

#[allow(unused_imports)]
use micromath::F32Ext;

/// Calibration of the speed to multiplier line.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityCalibration {
    pub min_multiplier: f32,
    pub max_multiplier: f32,
    /// Speed giving `min_multiplier`.
    pub min_ticks_per_scan: f32,
    /// Speed giving `max_multiplier`.
    pub max_ticks_per_scan: f32,
}

impl Default for VelocityCalibration {
    fn default() -> Self {
        VelocityCalibration {
            min_multiplier: 1.0,
            max_multiplier: 256.0,
            min_ticks_per_scan: 0.0363,
            max_ticks_per_scan: 0.3025,
        }
    }
}

/// Precomputed line for a [`VelocityCalibration`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityEstimator {
    slope: f32,
    offset: f32,
    min: f32,
    max: f32,
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new(VelocityCalibration::default())
    }
}

impl VelocityEstimator {
    pub fn new(cal: VelocityCalibration) -> Self {
        let span = cal.max_ticks_per_scan - cal.min_ticks_per_scan;

        // A degenerate calibration gives a flat line at the minimum.
        let slope = if span > 0.0 {
            (cal.max_multiplier - cal.min_multiplier) / span
        } else {
            0.0
        };

        let offset = cal.min_multiplier - slope * cal.min_ticks_per_scan;

        VelocityEstimator {
            slope,
            offset,
            min: cal.min_multiplier,
            max: cal.max_multiplier.max(cal.min_multiplier),
        }
    }

    /// Multiplier for `ticks` steps over `cycles` idle scans.
    pub fn multiplier(&self, ticks: u8, cycles: u16) -> u16 {
        let tps = ticks as f32 / cycles.max(1) as f32;

        let m = self.slope * tps + self.offset;

        m.clamp(self.min, self.max).floor() as u16
    }
}
