/// One sample of the scan hardware: the two quadrature phases and the switch
/// closures of all 16 encoders, bit `n` belonging to physical encoder `n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub channel_a: u16,
    pub channel_b: u16,
    /// Set bit means the switch is closed.
    pub switches: u16,
}

/// Something that can be sampled once per scan period. Think shift registers
/// clocked out by the platform's timer interrupt.
pub trait SampleSource {
    fn sample(&mut self) -> RawSample;
}

impl<F> SampleSource for F
where
    F: FnMut() -> RawSample,
{
    fn sample(&mut self) -> RawSample {
        (self)()
    }
}
