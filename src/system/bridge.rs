//! I2C Register Bridge
//!
//! The FPGA fabric is reached through a small bridge that translates I2C
//! transfers into 32-bit register accesses.
//!
//! # Wire Format
//! - Read: write the 2-byte big-endian register address, then read 4 data
//!   bytes, little-endian
//! - Write: one transfer with the 2 address bytes followed by the 4 data bytes
//!
//! Every peripheral block gets its own handle on the bus, usually an
//! `I2cDevice` on a shared-bus mutex, so the blocks never see each other.

use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};

use crate::system::error::{Error, Result};
use crate::system::registers::RegisterBus;

/// Register bus over an I2C bridge
pub struct RegisterBridge<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> RegisterBridge<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }
}

impl<I: I2c> RegisterBus for RegisterBridge<I> {
    async fn read(&mut self, addr: u16) -> Result<u32> {
        let mut data = [0u8; 4];
        self.i2c
            .write_read(self.address, &addr.to_be_bytes(), &mut data)
            .await
            .map_err(|e| bus_error(e.kind()))?;
        Ok(u32::from_le_bytes(data))
    }

    async fn write(&mut self, addr: u16, value: u32) -> Result<()> {
        let [a0, a1] = addr.to_be_bytes();
        let [d0, d1, d2, d3] = value.to_le_bytes();
        self.i2c
            .write(self.address, &[a0, a1, d0, d1, d2, d3])
            .await
            .map_err(|e| bus_error(e.kind()))
    }
}

fn bus_error(kind: ErrorKind) -> Error {
    match kind {
        ErrorKind::NoAcknowledge(_) => Error::Nack,
        _ => Error::Transfer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::{ErrorType, NoAcknowledgeSource, Operation};
    use std::collections::HashMap;

    const BRIDGE: u8 = 0x42;

    /// Bridge model answering from a register map
    #[derive(Default)]
    struct FakeBridge {
        registers: HashMap<u16, u32>,
        transfers: Vec<(u8, Vec<u8>)>,
        fail: Option<ErrorKind>,
    }

    impl ErrorType for FakeBridge {
        type Error = ErrorKind;
    }

    impl I2c for FakeBridge {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> core::result::Result<(), Self::Error> {
            if let Some(kind) = self.fail.take() {
                return Err(kind);
            }
            let mut selected = 0u16;
            for operation in operations {
                match operation {
                    Operation::Write(bytes) => {
                        self.transfers.push((address, bytes.to_vec()));
                        selected = u16::from_be_bytes([bytes[0], bytes[1]]);
                        if bytes.len() == 6 {
                            let value = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
                            self.registers.insert(selected, value);
                        }
                    }
                    Operation::Read(buffer) => {
                        let value = self.registers.get(&selected).copied().unwrap_or(0);
                        buffer.copy_from_slice(&value.to_le_bytes());
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_write_frame() {
        let mut bridge = RegisterBridge::new(FakeBridge::default(), BRIDGE);
        block_on(bridge.write(0x0108, 0x1234_5678)).unwrap();
        assert_eq!(
            bridge.i2c.transfers,
            vec![(BRIDGE, vec![0x01, 0x08, 0x78, 0x56, 0x34, 0x12])]
        );
    }

    #[test]
    fn test_read_frame() {
        let mut fake = FakeBridge::default();
        fake.registers.insert(0x0204, 0x0000_0007);
        let mut bridge = RegisterBridge::new(fake, BRIDGE);
        assert_eq!(block_on(bridge.read(0x0204)).unwrap(), 7);
        assert_eq!(bridge.i2c.transfers, vec![(BRIDGE, vec![0x02, 0x04])]);
    }

    #[test]
    fn test_error_mapping() {
        let mut fake = FakeBridge::default();
        fake.fail = Some(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        let mut bridge = RegisterBridge::new(fake, BRIDGE);
        assert_eq!(block_on(bridge.read(0x0000)), Err(Error::Nack));

        bridge.i2c.fail = Some(ErrorKind::ArbitrationLoss);
        assert_eq!(block_on(bridge.write(0x0000, 1)), Err(Error::Transfer));
    }
}
