//! Error types for hardware access
//!
//! The control core never gives up on an error. Failures bubble up to the
//! control loop, get logged, and the next iteration tries again.

/// Failure of a register transfer on the bus to the FPGA fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The bridge did not acknowledge the transfer
    Nack,
    /// The transfer did not complete in time
    Timeout,
    /// Any other transfer failure (arbitration loss, framing, overrun)
    Transfer,
}

/// Result alias used across the control core
pub type Result<T> = core::result::Result<T, Error>;
