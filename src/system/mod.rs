//! Core system components of the rover
pub mod bridge;
pub mod command_decoder;
pub mod config;
pub mod controller;
pub mod drive_command;
pub mod duty;
pub mod error;
pub mod fusion;
pub mod ranging;
pub mod registers;
pub mod state;
pub mod vision;
pub mod wheels;

#[cfg(test)]
mod testing;
