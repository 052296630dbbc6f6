//! Hardware Resource Management
//!
//! Assigns the board's pins and peripherals to the firmware tasks and holds
//! the wiring constants of the FPGA side.
//!
//! # Resource Groups
//! - Serial: UART receiver of the Bluetooth serial module, with its DMA channel
//! - Bridge: I2C bus towards the FPGA register bridge
//!
//! # FPGA Address Map
//! The register bridge answers at `BRIDGE_ADDRESS`. Each peripheral block
//! occupies its own 256-byte window behind it.

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::Peri;
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{self, I2C0, UART1};
use embassy_rp::uart::InterruptHandler as UartInterruptHandler;

/// Baud rate of the Bluetooth serial module
pub const SERIAL_BAUD: u32 = 9_600;

/// I2C clock towards the register bridge (fast mode)
pub const BRIDGE_FREQUENCY: u32 = 400_000;

/// I2C address of the FPGA register bridge
pub const BRIDGE_ADDRESS: u8 = 0x42;

/// Motor driver block
pub const MOTOR_BASE: u16 = 0x0000;

/// Vision accelerator
pub const VISION_BASE: u16 = 0x0100;

/// Front ultrasonic ranger
pub const RANGE_FRONT_BASE: u16 = 0x0200;

/// Right ultrasonic ranger
pub const RANGE_RIGHT_BASE: u16 = 0x0300;

/// Left ultrasonic ranger
pub const RANGE_LEFT_BASE: u16 = 0x0400;

assign_resources! {
    /// Bluetooth serial module, receive only
    serial: SerialResources {
        uart: UART1,
        rx_pin: PIN_5,
        rx_dma: DMA_CH0,
    },
    /// I2C towards the FPGA register bridge
    bridge: BridgeResources {
        i2c: I2C0,
        scl: PIN_13,
        sda: PIN_12,
    },
}

bind_interrupts!(pub struct Irqs {
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
    UART1_IRQ => UartInterruptHandler<UART1>;
});
