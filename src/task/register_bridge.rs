//! Bounded register transfers
//!
//! An I2C transfer towards a bridge that stopped answering may stall forever
//! on clock stretching. Every register access of the firmware is therefore
//! bounded, and an overrun is reported like any other bus failure.

use embassy_time::{with_timeout, Duration};
use lane_rover::system::error::{Error, Result};
use lane_rover::system::registers::RegisterBus;

/// Upper bound of a single register transfer
const TRANSFER_TIMEOUT: Duration = Duration::from_millis(5);

/// Register bus whose transfers time out
pub struct TimedBus<B> {
    inner: B,
}

impl<B: RegisterBus> TimedBus<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

impl<B: RegisterBus> RegisterBus for TimedBus<B> {
    async fn read(&mut self, addr: u16) -> Result<u32> {
        with_timeout(TRANSFER_TIMEOUT, self.inner.read(addr))
            .await
            .map_err(|_| Error::Timeout)?
    }

    async fn write(&mut self, addr: u16, value: u32) -> Result<()> {
        with_timeout(TRANSFER_TIMEOUT, self.inner.write(addr, value))
            .await
            .map_err(|_| Error::Timeout)?
    }
}
