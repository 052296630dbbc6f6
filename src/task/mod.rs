pub mod control_loop;
pub mod register_bridge;
pub mod resources;
pub mod serial_command;
