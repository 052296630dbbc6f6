//! Drive State
//!
//! Holds what the rover is currently asked to do: its motion mode, the speed
//! intent and the steering value. The state is owned by the motion controller
//! and handed by reference to whatever needs it inside the control loop, so
//! there is exactly one writer at any time and no locking is needed.
//!
//! # State Components
//! - Motion mode: manual motions, the two autonomous modes, or stopped
//! - Speed: unsigned magnitude 0-100, direction comes from the mode
//! - Steer: -80..=80, positive turns left

use crate::system::config::{STARTUP_SPEED_PCT, STEER_LIMIT};

/// Motion modes of the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionMode {
    /// All outputs disabled
    Stopped,
    /// Driving forward along the current steer
    ManualForward,
    /// Driving backward along the current steer
    ManualBackward,
    /// Turning in place counter-clockwise
    SpinLeft,
    /// Turning in place clockwise
    SpinRight,
    /// Self-driving on ultrasonic ranging alone
    AutoUltrasonic,
    /// Self-driving on ultrasonic ranging fused with the vision estimate
    AutoFused,
}

impl MotionMode {
    /// The control tick runs the fusion engine in these modes
    pub fn is_autonomous(self) -> bool {
        matches!(self, MotionMode::AutoUltrasonic | MotionMode::AutoFused)
    }

    /// The vision estimate takes part in steering
    pub fn uses_vision(self) -> bool {
        self == MotionMode::AutoFused
    }

    /// The wheel motion this mode realizes; both autonomous modes drive forward
    pub fn motion(self) -> Motion {
        match self {
            MotionMode::Stopped => Motion::Stopped,
            MotionMode::ManualForward | MotionMode::AutoUltrasonic | MotionMode::AutoFused => {
                Motion::Forward
            }
            MotionMode::ManualBackward => Motion::Backward,
            MotionMode::SpinLeft => Motion::SpinLeft,
            MotionMode::SpinRight => Motion::SpinRight,
        }
    }
}

/// What the wheels are doing, independent of who asked for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motion {
    Stopped,
    Forward,
    Backward,
    SpinLeft,
    SpinRight,
}

impl Motion {
    /// The manual mode that repeats this motion
    pub fn manual_mode(self) -> MotionMode {
        match self {
            Motion::Stopped => MotionMode::Stopped,
            Motion::Forward => MotionMode::ManualForward,
            Motion::Backward => MotionMode::ManualBackward,
            Motion::SpinLeft => MotionMode::SpinLeft,
            Motion::SpinRight => MotionMode::SpinRight,
        }
    }
}

/// Speed, steer and mode of the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveState {
    /// Speed magnitude (0-100)
    speed_pct: u8,
    /// Steering (-80..=80, positive = left)
    steer: i32,
    /// Current motion mode
    pub mode: MotionMode,
}

impl Default for DriveState {
    /// Stopped, minimum sustained-motion speed, straight ahead
    fn default() -> Self {
        Self {
            speed_pct: STARTUP_SPEED_PCT,
            steer: 0,
            mode: MotionMode::Stopped,
        }
    }
}

impl DriveState {
    pub fn speed_pct(&self) -> u8 {
        self.speed_pct
    }

    pub fn steer(&self) -> i32 {
        self.steer
    }

    /// Sets the speed, clamped to 0-100
    pub fn set_speed(&mut self, speed_pct: i32) {
        self.speed_pct = speed_pct.clamp(0, 100) as u8;
    }

    /// Sets the steer, clamped to -80..=80
    pub fn set_steer(&mut self, steer: i32) {
        self.steer = steer.clamp(-STEER_LIMIT, STEER_LIMIT);
    }
}
