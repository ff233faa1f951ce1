//! Switch debouncing by OR-ing the last `N` raw samples.
//!
//! A closing contact is seen on the very first sample that has it set. An
//! opening contact is only seen once every buffered sample has cleared, so a
//! release takes `N` scans to register and chatter on release is swallowed.

/// Default number of samples kept.
pub const SWITCH_DEBOUNCE_DEPTH: usize = 10;

/// Stable switch state and the edges since the previous update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchEdges {
    /// Bit set for a closed switch.
    pub state: u16,
    /// Switches that closed since last update.
    pub down: u16,
    /// Switches that opened since last update.
    pub up: u16,
}

impl SwitchEdges {
    pub fn is_down(&self, bit: u16) -> bool {
        self.down & bit != 0
    }

    pub fn is_up(&self, bit: u16) -> bool {
        self.up & bit != 0
    }

    pub fn is_held(&self, bit: u16) -> bool {
        self.state & bit != 0
    }

    pub fn changed(&self, bit: u16) -> bool {
        (self.down | self.up) & bit != 0
    }
}

/// Circular buffer of raw switch samples.
#[derive(Debug, Clone)]
pub struct SwitchDebouncer<const N: usize = SWITCH_DEBOUNCE_DEPTH> {
    samples: [u16; N],
    insert: usize,
    prev: u16,
    edges: SwitchEdges,
}

impl<const N: usize> Default for SwitchDebouncer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SwitchDebouncer<N> {
    pub const fn new() -> Self {
        assert!(N > 0);
        SwitchDebouncer {
            samples: [0; N],
            insert: 0,
            prev: 0,
            edges: SwitchEdges {
                state: 0,
                down: 0,
                up: 0,
            },
        }
    }

    /// Store a raw sample, overwriting the oldest.
    pub fn push(&mut self, raw: u16) {
        self.samples[self.insert] = raw;
        self.insert += 1;
        self.insert %= N;
    }

    /// Recompute the stable state and the edges against the previous stable
    /// state. Returns the stable state.
    pub fn update(&mut self) -> u16 {
        let stable = self.samples.iter().fold(0, |acc, s| acc | s);

        self.edges = SwitchEdges {
            state: stable,
            up: (self.prev ^ stable) & self.prev,
            down: (self.prev ^ stable) & stable,
        };

        self.prev = stable;

        stable
    }

    /// Result of the last [`update`](Self::update).
    pub fn edges(&self) -> SwitchEdges {
        self.edges
    }
}
