//! Errors at the seams of the input core.

use core::convert::Infallible;
use core::fmt;

/// Errors for operations taking raw indices or touching persistent storage.
///
/// Nothing in the scan/classify/resolve path fails; these only surface when
/// converting untrusted numbers into ids or when the configuration store does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E = Infallible> {
    /// Bank index out of range (must be 0-3).
    InvalidBank(u8),

    /// Encoder index out of range (must be 0-15).
    InvalidEncoder(u8),

    /// The configuration store failed.
    Store(E),
}

impl Error {
    /// Widen an id error into one carrying a store error type.
    pub fn lift<E>(self) -> Error<E> {
        match self {
            Error::InvalidBank(n) => Error::InvalidBank(n),
            Error::InvalidEncoder(n) => Error::InvalidEncoder(n),
            Error::Store(never) => match never {},
        }
    }
}

// Allow `?` on store results.
impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Store(error)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidBank(n) => write!(f, "Invalid bank index {} (must be 0-3)", n),
            Error::InvalidEncoder(n) => write!(f, "Invalid encoder index {} (must be 0-15)", n),
            Error::Store(e) => write!(f, "Config store error: {:?}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidBank(n) => defmt::write!(f, "Invalid bank index {}", n),
            Error::InvalidEncoder(n) => defmt::write!(f, "Invalid encoder index {}", n),
            Error::Store(e) => defmt::write!(f, "Config store error: {}", e),
        }
    }
}
