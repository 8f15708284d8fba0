//! Error types for the ParcelBox firmware.
//!
//! Backend and driver failures are small `Copy` enums so they can be passed
//! through the controller and into events without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Failure kinds reported by a [`BackendPort`](crate::app::ports::BackendPort).
///
/// The controller branches on the kind, never on message text: connectivity
/// kinds take the backend offline and arm a reconnect, everything else is
/// logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failure: DNS, TCP, TLS, or the client is not connected.
    Unreachable,
    /// The request did not complete in time.
    Timeout,
    /// Credentials rejected (HTTP 401/403).
    AuthFailure,
    /// Path or document does not exist.
    NotFound,
    /// The server refused the request with another status code.
    Rejected(u16),
    /// The response body could not be decoded.
    Malformed,
}

impl BackendError {
    /// `true` for kinds that mean the link to the backend is down.
    pub const fn is_connectivity(self) -> bool {
        matches!(self, Self::Unreachable | Self::Timeout)
    }

    /// Map an HTTP status code to a result.
    pub fn from_status(status: u16) -> Result<(), Self> {
        match status {
            200..=299 => Ok(()),
            401 | 403 => Err(Self::AuthFailure),
            404 => Err(Self::NotFound),
            408 | 504 => Err(Self::Timeout),
            502 | 503 => Err(Self::Unreachable),
            other => Err(Self::Rejected(other)),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "backend unreachable"),
            Self::Timeout => write!(f, "request timed out"),
            Self::AuthFailure => write!(f, "authentication rejected"),
            Self::NotFound => write!(f, "not found"),
            Self::Rejected(code) => write!(f, "rejected with HTTP {code}"),
            Self::Malformed => write!(f, "malformed response"),
        }
    }
}

impl std::error::Error for BackendError {}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// I2C transaction failed (LCD backpack).
    I2c,
    /// SPI transaction failed (RFID reader).
    Spi,
    /// GPIO read or write failed.
    Gpio,
    /// The peripheral did not answer in time.
    Timeout,
    /// The peripheral answered with an inconsistent frame.
    Protocol,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c => write!(f, "I2C transfer failed"),
            Self::Spi => write!(f, "SPI transfer failed"),
            Self::Gpio => write!(f, "GPIO access failed"),
            Self::Timeout => write!(f, "peripheral timeout"),
            Self::Protocol => write!(f, "protocol error"),
        }
    }
}

impl std::error::Error for DriverError {}
