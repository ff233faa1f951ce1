//! Addressing of the 16 physical knobs across banks and shift states.
//!
//! ```ignore
//! banked  = bank * 16 + physical                       0..64
//! virtual = banked + if shifted { 64 } else { 0 }     0..128
//! ```
//!
//! The banked id picks one of 64 configuration records. The virtual id picks
//! one of 128 raw value slots, so the shifted and unshifted sides of a knob
//! remember their own position.

use crate::error::Error;

pub const PHYSICAL_ENCODERS: usize = 16;
pub const NUM_BANKS: usize = 4;
pub const BANKED_ENCODERS: usize = PHYSICAL_ENCODERS * NUM_BANKS;
pub const VIRTUAL_ENCODERS: usize = BANKED_ENCODERS * 2;

/// One of the 16 knobs on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalEncoder(u8);

impl PhysicalEncoder {
    /// Panics (at compile time in const context) if `n > 15`.
    pub const fn new_const(n: u8) -> Self {
        assert!((n as usize) < PHYSICAL_ENCODERS);
        PhysicalEncoder(n)
    }

    /// Keep the low 4 bits, the way protocol fields are treated.
    pub const fn from_masked(n: u8) -> Self {
        PhysicalEncoder(n & 0x0F)
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// The bit of this encoder in a 16 bit mask.
    pub const fn bit(&self) -> u16 {
        1 << self.0
    }

    pub fn all() -> impl Iterator<Item = PhysicalEncoder> {
        (0..PHYSICAL_ENCODERS as u8).map(PhysicalEncoder)
    }
}

impl TryFrom<u8> for PhysicalEncoder {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        if (n as usize) < PHYSICAL_ENCODERS {
            Ok(PhysicalEncoder(n))
        } else {
            Err(Error::InvalidEncoder(n))
        }
    }
}

impl From<PhysicalEncoder> for u8 {
    fn from(e: PhysicalEncoder) -> Self {
        e.0
    }
}

/// One of the 4 banks of 16 mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bank(u8);

impl Bank {
    pub const fn new_const(n: u8) -> Self {
        assert!((n as usize) < NUM_BANKS);
        Bank(n)
    }

    pub const fn from_masked(n: u8) -> Self {
        Bank(n & 0x03)
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = Bank> {
        (0..NUM_BANKS as u8).map(Bank)
    }
}

impl TryFrom<u8> for Bank {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        if (n as usize) < NUM_BANKS {
            Ok(Bank(n))
        } else {
            Err(Error::InvalidBank(n))
        }
    }
}

impl From<Bank> for u8 {
    fn from(b: Bank) -> Self {
        b.0
    }
}

/// Index 0..64 of a configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BankedEncoderId(u8);

impl BankedEncoderId {
    pub const fn new(bank: Bank, encoder: PhysicalEncoder) -> Self {
        BankedEncoderId(bank.0 * PHYSICAL_ENCODERS as u8 + encoder.0)
    }

    /// Keep the low 6 bits.
    pub const fn from_masked(n: u8) -> Self {
        BankedEncoderId(n & 0x3F)
    }

    pub const fn bank(&self) -> Bank {
        Bank(self.0 / PHYSICAL_ENCODERS as u8)
    }

    pub const fn encoder(&self) -> PhysicalEncoder {
        PhysicalEncoder(self.0 % PHYSICAL_ENCODERS as u8)
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// The raw value slot for one side of this knob.
    pub const fn virtual_id(&self, shifted: bool) -> VirtualEncoderId {
        VirtualEncoderId::new(*self, shifted)
    }

    pub fn all() -> impl Iterator<Item = BankedEncoderId> {
        (0..BANKED_ENCODERS as u8).map(BankedEncoderId)
    }
}

/// Index 0..128 of a raw value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VirtualEncoderId(u8);

impl VirtualEncoderId {
    pub const fn new(banked: BankedEncoderId, shifted: bool) -> Self {
        VirtualEncoderId(banked.0 + if shifted { BANKED_ENCODERS as u8 } else { 0 })
    }

    /// Keep the low 7 bits.
    pub const fn from_masked(n: u8) -> Self {
        VirtualEncoderId(n & 0x7F)
    }

    pub const fn banked(&self) -> BankedEncoderId {
        BankedEncoderId(self.0 & 0x3F)
    }

    pub const fn is_shifted(&self) -> bool {
        self.0 as usize >= BANKED_ENCODERS
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// `bank * 16 + encoder`.
pub const fn banked_id(bank: Bank, encoder: PhysicalEncoder) -> BankedEncoderId {
    BankedEncoderId::new(bank, encoder)
}

/// `bank * 16 + encoder + (shifted ? 64 : 0)`.
pub const fn virtual_id(bank: Bank, encoder: PhysicalEncoder, shifted: bool) -> VirtualEncoderId {
    VirtualEncoderId::new(BankedEncoderId::new(bank, encoder), shifted)
}
