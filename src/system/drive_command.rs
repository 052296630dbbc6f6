//! Drive Command Module
//!
//! Discrete drive intents produced by the serial command decoder and consumed
//! by the motion controller.
//!
//! # Key Map
//!
//! ```text
//!   W/w          forward at the current speed and steer
//!   S/s, R/r     backward at the current speed and steer
//!   A/a, D/d     spin left / right in place
//!   X/x, space   stop, leave autonomy
//!   Z/z          autonomy on ultrasonic ranging only
//!   Y/y          autonomy on ranging fused with vision
//!   + / -        speed +10 / -10, keep the current motion
//!   ?            status report
//!   H/h          key map
//!   C<n> <m>     speed n (sign = direction), steer m
//! ```

use crate::system::config::SPEED_STEP_PCT;

/// Drive intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Drive forward at the current speed and steer
    Forward,
    /// Drive backward at the current speed and steer
    Backward,
    /// Turn in place counter-clockwise
    SpinLeft,
    /// Turn in place clockwise
    SpinRight,
    /// Disable all outputs and leave any autonomous mode
    Stop,
    /// Self-drive on ultrasonic ranging only
    AutoUltrasonic,
    /// Self-drive on ranging fused with the vision estimate
    AutoFused,
    /// Change speed by the given step and repeat the current motion
    SpeedStep(i32),
    /// Log the current state
    Status,
    /// Log the key map
    Help,
    /// Structured command: signed speed (-100..=100) and steer (-80..=80)
    Set { speed: i32, steer: i32 },
}

impl Command {
    /// Maps a single key to its command. Unknown keys map to `None`.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            b'W' | b'w' => Some(Command::Forward),
            b'S' | b's' | b'R' | b'r' => Some(Command::Backward),
            b'A' | b'a' => Some(Command::SpinLeft),
            b'D' | b'd' => Some(Command::SpinRight),
            b'X' | b'x' | b' ' => Some(Command::Stop),
            b'Z' | b'z' => Some(Command::AutoUltrasonic),
            b'Y' | b'y' => Some(Command::AutoFused),
            b'+' => Some(Command::SpeedStep(SPEED_STEP_PCT)),
            b'-' => Some(Command::SpeedStep(-SPEED_STEP_PCT)),
            b'?' => Some(Command::Status),
            b'H' | b'h' => Some(Command::Help),
            _ => None,
        }
    }

    /// Keys that may abort a running emergency maneuver
    pub fn is_abort_key(key: u8) -> bool {
        matches!(key, b'X' | b'x')
    }
}
