//! Serial Command Reader
//!
//! Receives the operator's key presses from the Bluetooth serial module and
//! hands every byte to the control loop. Decoding happens in the control loop;
//! this task only moves bytes.
//!
//! A stop key also raises `STOP_REQUESTED` right away, which is the one input
//! a running emergency maneuver still listens to.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, warn};
use embassy_rp::uart::{self, UartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use lane_rover::system::drive_command::Command;

use crate::task::resources::{Irqs, SerialResources, SERIAL_BAUD};

/// Bytes buffered while the control loop is busy
const QUEUE_DEPTH: usize = 64;

/// Received bytes, in arrival order
static SERIAL_BYTES: Channel<CriticalSectionRawMutex, u8, QUEUE_DEPTH> = Channel::new();

/// Raised on a stop key, cleared by the control loop once it polls input again
pub static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Receiving end of the byte queue, for the control loop
pub fn receiver() -> Receiver<'static, CriticalSectionRawMutex, u8, QUEUE_DEPTH> {
    SERIAL_BYTES.receiver()
}

#[embassy_executor::task]
pub async fn serial_command(r: SerialResources) {
    let mut config = uart::Config::default();
    config.baudrate = SERIAL_BAUD;
    let mut rx = UartRx::new(r.uart, r.rx_pin, Irqs, r.rx_dma, config);
    info!("serial reader up at {} baud", SERIAL_BAUD);

    let mut byte = [0u8; 1];
    loop {
        if let Err(e) = rx.read(&mut byte).await {
            warn!("serial receive error: {:?}", e);
            continue;
        }

        if Command::is_abort_key(byte[0]) {
            STOP_REQUESTED.store(true, Ordering::Relaxed);
        }
        if SERIAL_BYTES.try_send(byte[0]).is_err() {
            warn!("serial queue full, dropped {=u8:#x}", byte[0]);
        }
    }
}
