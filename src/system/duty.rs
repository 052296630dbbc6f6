//! Duty-Cycle Synthesis
//!
//! Turns a speed intent and a steering value into one duty per side of the
//! rover. Pure arithmetic, no hardware access.
//!
//! # Floors
//! A DC motor below a certain duty either stalls or pulses audibly. The faster
//! side is therefore held at or above `DUTY_MIN_MOVE`, the slower side of a
//! curve at or above `DUTY_MIN_TURN`. A side at zero stays at zero: zero means
//! the wheel is stopped, not barely turning. When both sides are equal, both
//! are the faster side, so driving straight always yields equal duties.

use crate::system::config::{DUTY_MAX, DUTY_MIN_MOVE, DUTY_MIN_TURN, STEER_LIMIT, STEER_SIGN};

/// Duty for each side of the rover, 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SideDuty {
    pub left: u8,
    pub right: u8,
}

/// Computes the left and right duty for a speed (0-100) and a steer value
/// (-80..=80, positive = left).
pub fn synthesize(speed_pct: u8, steer: i32) -> SideDuty {
    let speed = i32::from(speed_pct.min(DUTY_MAX));
    let s = steer.clamp(-STEER_LIMIT, STEER_LIMIT) * STEER_SIGN;

    let left = clamp_duty(speed * (100 + s) / 100);
    let right = clamp_duty(speed * (100 - s) / 100);

    let (left, right) = if left == right {
        (floor(left, DUTY_MIN_MOVE), floor(right, DUTY_MIN_MOVE))
    } else if left > right {
        (floor(left, DUTY_MIN_MOVE), floor(right, DUTY_MIN_TURN))
    } else {
        (floor(left, DUTY_MIN_TURN), floor(right, DUTY_MIN_MOVE))
    };

    SideDuty { left, right }
}

#[inline]
fn clamp_duty(value: i32) -> u8 {
    value.clamp(0, i32::from(DUTY_MAX)) as u8
}

/// Raises a nonzero duty to `min`, leaves zero alone
#[inline]
fn floor(duty: u8, min: u8) -> u8 {
    if duty > 0 && duty < min {
        min
    } else {
        duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_is_symmetric() {
        for speed in 0..=100u8 {
            let duty = synthesize(speed, 0);
            assert_eq!(duty.left, duty.right, "speed {}", speed);
        }
    }

    #[test]
    fn test_zero_speed_stays_zero() {
        for steer in -80..=80 {
            assert_eq!(synthesize(0, steer), SideDuty { left: 0, right: 0 });
        }
    }

    #[test]
    fn test_positive_steer_turns_left() {
        let duty = synthesize(50, 40);
        assert_eq!(duty, SideDuty { left: 30, right: 70 });

        let duty = synthesize(50, -40);
        assert_eq!(duty, SideDuty { left: 70, right: 30 });
    }

    #[test]
    fn test_floors_apply_to_slow_speeds() {
        // 20% straight is below the sustained-motion floor on both sides
        assert_eq!(synthesize(20, 0), SideDuty { left: 30, right: 30 });

        // 20% at full left lock: left 4 -> 14, right 36 stays
        assert_eq!(synthesize(20, 80), SideDuty { left: 14, right: 36 });

        // 10% at slight right: left 10*110/100 = 11 -> 30, right 9 -> 14
        assert_eq!(synthesize(10, -10), SideDuty { left: 30, right: 14 });
    }

    #[test]
    fn test_outputs_in_range_and_floored() {
        for speed in 0..=100u8 {
            for steer in -80..=80 {
                let duty = synthesize(speed, steer);
                assert!(duty.left <= 100 && duty.right <= 100);
                if duty.left > 0 && duty.right > 0 {
                    let (hi, lo) = if duty.left >= duty.right {
                        (duty.left, duty.right)
                    } else {
                        (duty.right, duty.left)
                    };
                    assert!(hi >= DUTY_MIN_MOVE, "speed {} steer {}", speed, steer);
                    assert!(lo >= DUTY_MIN_TURN, "speed {} steer {}", speed, steer);
                }
                // Re-synthesizing never changes the result
                assert_eq!(duty, synthesize(speed, steer));
            }
        }
    }

    #[test]
    fn test_more_steer_slows_inside_and_speeds_outside() {
        for speed in [14u8, 25, 30, 50, 75, 100] {
            let mut previous = synthesize(speed, 0);
            for steer in 1..=80 {
                let duty = synthesize(speed, steer);
                // Left is the inside wheel for positive steer
                assert!(duty.left <= previous.left, "speed {} steer {}", speed, steer);
                assert!(duty.right >= previous.right, "speed {} steer {}", speed, steer);
                previous = duty;
            }

            let mut previous = synthesize(speed, 0);
            for steer in (-80..=-1).rev() {
                let duty = synthesize(speed, steer);
                assert!(duty.right <= previous.right, "speed {} steer {}", speed, steer);
                assert!(duty.left >= previous.left, "speed {} steer {}", speed, steer);
                previous = duty;
            }
        }
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        assert_eq!(synthesize(100, 200), synthesize(100, 80));
        assert_eq!(synthesize(255, 0), SideDuty { left: 100, right: 100 });
    }
}
