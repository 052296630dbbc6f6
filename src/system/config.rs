//! Tuning and Calibration Constants
//!
//! Every threshold, gain and timing the control core uses, in one place.
//! Values are in percent duty, centimeters, milliseconds or steering units
//! (-80..=80, positive = left) unless the name says otherwise.

use crate::system::registers::Channel;

// === Duty-cycle synthesis ===

/// Minimum duty for the faster side, below which the wheels stall
pub const DUTY_MIN_MOVE: u8 = 30;

/// Minimum duty for the slower side in a curve, below which the motor pulses
pub const DUTY_MIN_TURN: u8 = 14;

/// Full duty
pub const DUTY_MAX: u8 = 100;

/// Steering polarity switch, flips the sign of every steer value before synthesis
pub const STEER_SIGN: i32 = -1;

/// Steering limit in both directions
pub const STEER_LIMIT: i32 = 80;

// === Actuation ===

/// Duty of the friction kick that precedes a start from rest or a very low duty
pub const KICK_DUTY: u8 = 70;

/// Length of the friction kick
pub const KICK_MS: u32 = 120;

/// Outputs stay disabled this long before direction bits change (shoot-through guard)
pub const DEAD_TIME_US: u32 = 150;

/// Duty delta below which a new command is treated as noise
pub const DUTY_DEADBAND: u8 = 2;

/// Duty used on all four channels when spinning in place
pub const SPIN_DUTY: u8 = 80;

/// Per-wheel polarity correction, indexed by channel (FR, FL, RL, RR)
pub const WHEEL_INVERSION: [bool; 4] = [true, false, true, false];

/// Channels reversed for a left spin. The rear axle of this chassis is wired
/// mirrored, so the rear wheel that must reverse sits on the opposite side.
pub const SPIN_LEFT_REVERSED: [Channel; 2] = [Channel::FrontLeft, Channel::RearRight];

/// Channels reversed for a right spin
pub const SPIN_RIGHT_REVERSED: [Channel; 2] = [Channel::FrontRight, Channel::RearLeft];

// === Manual driving ===

/// Speed at power-up
pub const STARTUP_SPEED_PCT: u8 = DUTY_MIN_MOVE;

/// Step applied by the speed nudge keys
pub const SPEED_STEP_PCT: i32 = 10;

// === Autonomous driving ===

/// Cruise speed in both autonomous modes
pub const AUTO_BASE_PCT: u8 = 50;

/// Side distance at which wall avoidance starts
pub const WALL_CM: u16 = 50;

/// Gain applied to the wall intrusion depth
pub const STEER_GAIN: i32 = 22;

/// Nearest side distance below which the avoidance term is boosted
pub const NEAR_BOOST_CM: u16 = 35;

/// Multiplier applied to the avoidance term inside the near-boost distance
pub const STEER_BOOST: i32 = 2;

/// Front distance of the outer slow-down band
pub const FRONT_SLOW1_CM: u16 = 85;

/// Front distance of the inner slow-down band
pub const FRONT_SLOW2_CM: u16 = 50;

/// Speed inside the outer slow-down band
pub const FRONT_SLOW1_PCT: u8 = 40;

/// Speed inside the inner slow-down band
pub const FRONT_SLOW2_PCT: u8 = 30;

/// Avoidance terms above this magnitude override lane following
pub const OBSTACLE_OVERRIDE: i32 = 20;

/// Avoidance terms above this magnitude are blended with lane following
pub const OBSTACLE_BLEND: i32 = 10;

// === Emergency avoidance ===

/// Front distance that triggers the reverse-and-spin maneuver
pub const PANIC_CM: u16 = 18;

/// Reverse duty during the maneuver
pub const BACKUP_PCT: u8 = 55;

/// Reverse duration during the maneuver
pub const BACKUP_MS: u32 = 800;

/// Number of spin steps; the maneuver checks for cancellation between steps
pub const SPIN_STEPS: u8 = 10;

/// Length of one spin step
pub const SPIN_STEP_MS: u32 = 100;

// === Vision core ===

/// Divisor turning the raw accelerator result into steering units
pub const VISION_SCALE: i64 = 1000;

/// Estimates below this magnitude are a straight lane
pub const PATTERN_STRAIGHT_MAX: i32 = 10;

/// Estimates beyond this magnitude are a curve
pub const PATTERN_CURVE_MIN: i32 = 30;

/// Extra steering added in the direction of a detected curve
pub const CURVE_BIAS: i32 = 5;

/// Consecutive empty readings the last estimate is held for (10 ticks = 200 ms)
pub const VISION_HOLD_TICKS: u8 = 10;

/// Per-tick decay of a stale estimate once vision is considered lost, as a ratio
pub const VISION_DECAY: (i32, i32) = (9, 10);

/// Hold time of the accelerator reset pulse at startup
pub const VISION_RESET_MS: u32 = 1;

// === Ranging ===

/// Samples averaged per sensor each tick
pub const RANGE_SAMPLES: u8 = 3;

/// Spacing between two samples of the same sensor
pub const RANGE_SAMPLE_SPACING_MS: u32 = 1;

/// Smallest plausible distance
pub const RANGE_MIN_CM: u16 = 1;

/// Largest plausible distance
pub const RANGE_MAX_CM: u16 = 400;

// === Control loop ===

/// Control tick period of the autonomous modes
pub const TICK_MS: u32 = 20;

/// Autonomous ticks between two status reports
pub const REPORT_EVERY_TICKS: u8 = 10;
