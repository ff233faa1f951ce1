//! The hand-over between the fast scan context and the main loop.
//!
//! The platform timer calls [`SharedScanner::scan`] every scan period. The
//! main loop calls [`SharedScanner::take`] once per pass. Both run inside a
//! critical section, so the main loop never sees half a scan.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::address::{PhysicalEncoder, PHYSICAL_ENCODERS};
use crate::debounce::{SwitchDebouncer, SwitchEdges};
use crate::encoder::QuadratureDecoder;
use crate::input::{RawSample, SampleSource};

/// Everything the main loop needs from one pass worth of scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanSnapshot {
    /// Net steps per encoder.
    pub steps: [i8; PHYSICAL_ENCODERS],
    /// Idle cycle sum per encoder, see [`QuadratureDecoder::take_idle_cycle_sum`].
    pub idle_cycles: [u16; PHYSICAL_ENCODERS],
    /// Encoders turned recently.
    pub active: u16,
    pub switches: SwitchEdges,
}

impl ScanSnapshot {
    pub fn steps(&self, id: PhysicalEncoder) -> i8 {
        self.steps[id.index()]
    }

    pub fn idle_cycles(&self, id: PhysicalEncoder) -> u16 {
        self.idle_cycles[id.index()]
    }

    pub fn is_active(&self, id: PhysicalEncoder) -> bool {
        self.active & id.bit() != 0
    }
}

/// State owned by the scan context.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    decoder: QuadratureDecoder,
    debouncer: SwitchDebouncer,
}

impl Scanner {
    pub const fn new() -> Self {
        Scanner {
            decoder: QuadratureDecoder::new(),
            debouncer: SwitchDebouncer::new(),
        }
    }

    /// One scan period worth of work.
    pub fn scan(&mut self, sample: RawSample) {
        self.debouncer.push(sample.switches);
        self.decoder.scan(sample.channel_a, sample.channel_b);
    }

    /// Take and reset the accumulators, and debounce the switches.
    pub fn take(&mut self) -> ScanSnapshot {
        let mut snap = ScanSnapshot::default();

        for id in PhysicalEncoder::all() {
            snap.steps[id.index()] = self.decoder.take_steps(id);
            snap.idle_cycles[id.index()] = self.decoder.take_idle_cycle_sum(id);
        }

        snap.active = self.decoder.active_mask();

        self.debouncer.update();
        snap.switches = self.debouncer.edges();

        snap
    }
}

/// A [`Scanner`] that can live in a `static` and be shared between an
/// interrupt handler and the main loop.
pub struct SharedScanner {
    inner: Mutex<RefCell<Scanner>>,
}

impl Default for SharedScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedScanner {
    pub const fn new() -> Self {
        SharedScanner {
            inner: Mutex::new(RefCell::new(Scanner::new())),
        }
    }

    /// Called from the scan period timer.
    pub fn scan(&self, sample: RawSample) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).scan(sample);
        });
    }

    /// Sample a source and scan it.
    pub fn scan_from<S: SampleSource>(&self, source: &mut S) {
        let sample = source.sample();
        self.scan(sample);
    }

    /// Called once per main loop pass.
    pub fn take(&self) -> ScanSnapshot {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }
}
