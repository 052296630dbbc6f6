//! Control Loop Task
//!
//! Owns the rover and runs its cooperative superloop. Once per millisecond it
//! drains the serial bytes received so far, then lets the rover run a control
//! tick when one is due.
//!
//! All peripheral blocks talk to the FPGA through the same I2C bus. They live
//! in this one task, so the bus is shared through a no-op mutex.

use core::sync::atomic::Ordering;

use defmt::{info, warn};
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Duration, Timer};
use lane_rover::system::bridge::RegisterBridge;
use lane_rover::system::controller::{Hardware, Rover, TickOutcome};
use lane_rover::system::ranging::{RangeSensor, Rangefinders};
use lane_rover::system::vision::VisionCore;
use lane_rover::system::wheels::MotorBlock;

use crate::task::register_bridge::TimedBus;
use crate::task::resources::{
    BridgeResources, Irqs, BRIDGE_ADDRESS, BRIDGE_FREQUENCY, MOTOR_BASE, RANGE_FRONT_BASE,
    RANGE_LEFT_BASE, RANGE_RIGHT_BASE, VISION_BASE,
};
use crate::task::serial_command::{self, STOP_REQUESTED};

/// Period of one superloop pass
const LOOP_PERIOD: Duration = Duration::from_millis(1);

type BridgeI2c = I2c<'static, I2C0, i2c::Async>;

/// One peripheral block's handle on the shared bridge
fn bridge(
    bus: &Mutex<NoopRawMutex, BridgeI2c>,
) -> TimedBus<RegisterBridge<I2cDevice<'_, NoopRawMutex, BridgeI2c>>> {
    TimedBus::new(RegisterBridge::new(I2cDevice::new(bus), BRIDGE_ADDRESS))
}

#[embassy_executor::task]
pub async fn control_loop(r: BridgeResources) {
    let mut config = i2c::Config::default();
    config.frequency = BRIDGE_FREQUENCY;
    let i2c = I2c::new_async(r.i2c, r.scl, r.sda, Irqs, config);
    let bus: Mutex<NoopRawMutex, BridgeI2c> = Mutex::new(i2c);

    let hardware = Hardware {
        motors: MotorBlock::new(bridge(&bus), MOTOR_BASE),
        vision: VisionCore::new(bridge(&bus), VISION_BASE),
        ranging: Rangefinders {
            front: RangeSensor::new(bridge(&bus), RANGE_FRONT_BASE),
            right: RangeSensor::new(bridge(&bus), RANGE_RIGHT_BASE),
            left: RangeSensor::new(bridge(&bus), RANGE_LEFT_BASE),
        },
    };
    let mut rover = Rover::new(hardware, Delay);
    rover.init().await;

    // Anything typed before the rover was ready is stale
    let bytes = serial_command::receiver();
    let mut flushed = 0u32;
    while bytes.try_receive().is_ok() {
        flushed += 1;
    }
    if flushed > 0 {
        warn!("discarded {} serial bytes received during startup", flushed);
    }
    STOP_REQUESTED.store(false, Ordering::Relaxed);
    info!("control loop running");

    loop {
        // Input polled now supersedes any stop request raised meanwhile
        STOP_REQUESTED.store(false, Ordering::Relaxed);
        while let Ok(byte) = bytes.try_receive() {
            rover.handle_byte(byte).await;
        }

        if let Some(TickOutcome::Cancelled) = rover.step(&STOP_REQUESTED).await {
            warn!("emergency maneuver cancelled by operator");
        }

        Timer::after(LOOP_PERIOD).await;
    }
}
