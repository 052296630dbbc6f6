//! Rover firmware entry point
//!
//! Initializes the board and spawns the serial reader and the control loop.

#![no_std]
#![no_main]

use crate::task::{control_loop::control_loop, serial_command::serial_command};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use task::resources::{AssignedResources, BridgeResources, SerialResources};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    // The reader comes first so no byte is lost while the rover initializes
    spawner.spawn(serial_command(r.serial)).unwrap();
    spawner.spawn(control_loop(r.bridge)).unwrap();
}
