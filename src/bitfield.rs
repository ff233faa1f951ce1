/// One bit per physical encoder of a bank.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bitfield(u16);

impl Bitfield {
    pub const fn new(bits: u16) -> Self {
        Bitfield(bits)
    }

    pub fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= 1 << bit;
        } else {
            self.0 &= !(1 << bit);
        }
    }

    pub fn toggle(&mut self, bit: u8) {
        self.0 ^= 1 << bit;
    }

    pub fn is(&self, bit: u8) -> bool {
        (self.0 & (1 << bit)) > 0
    }
}

impl core::ops::Deref for Bitfield {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
