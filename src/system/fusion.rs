//! Steering Fusion
//!
//! Combines the ultrasonic side distances and the vision core's lane estimate
//! into one steering value per control tick. Both sources are unreliable and
//! update on their own schedule, so the engine keeps one step of memory for
//! the vision estimate and degrades explicitly when it goes stale.
//!
//! # Obstacle Term
//! Each side wall closer than `WALL_CM` pushes the rover away from it in
//! proportion to how deep it intrudes. A right wall steers left (positive),
//! a left wall steers right. Inside `NEAR_BOOST_CM` the term is doubled.
//!
//! # Vision Degradation
//! - New estimate: classified, corrected, remembered, blended with the obstacle term
//! - Up to `VISION_HOLD_TICKS` empty reads: the last estimate is held unchanged
//! - Beyond that: vision is lost, the obstacle term steers alone and the
//!   remembered estimate decays by 10% per tick so a recovery blends in smoothly

use crate::system::config::{
    AUTO_BASE_PCT, FRONT_SLOW1_CM, FRONT_SLOW1_PCT, FRONT_SLOW2_CM, FRONT_SLOW2_PCT,
    NEAR_BOOST_CM, OBSTACLE_BLEND, OBSTACLE_OVERRIDE, PANIC_CM, STEER_BOOST, STEER_GAIN,
    STEER_LIMIT, VISION_DECAY, VISION_HOLD_TICKS, WALL_CM,
};
use crate::system::ranging::RangeSnapshot;
use crate::system::vision::Pattern;

/// Side of the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    Left,
    Right,
}

/// Wall avoidance steering from the side distances, unclamped
pub fn obstacle_term(snapshot: &RangeSnapshot) -> i32 {
    let right = snapshot.right.cm();
    let left = snapshot.left.cm();

    let mut steer = 0;
    if right > 0 && right <= WALL_CM {
        steer += i32::from(WALL_CM - right) * STEER_GAIN;
    }
    if left > 0 && left <= WALL_CM {
        steer -= i32::from(WALL_CM - left) * STEER_GAIN;
    }

    let nearest = min_nonzero(right, left);
    if nearest > 0 && nearest <= NEAR_BOOST_CM {
        steer *= STEER_BOOST;
    }
    steer
}

/// Autonomous speed from the front distance; no echo counts as a clear road
pub fn cruise_speed(snapshot: &RangeSnapshot) -> u8 {
    let front = snapshot.front.cm();
    if front > 0 && front < FRONT_SLOW2_CM {
        FRONT_SLOW2_PCT
    } else if front > 0 && front < FRONT_SLOW1_CM {
        FRONT_SLOW1_PCT
    } else {
        AUTO_BASE_PCT
    }
}

/// Side to spin towards when the front is inside the panic distance.
///
/// Ties go left.
pub fn emergency_side(snapshot: &RangeSnapshot) -> Option<Side> {
    let front = snapshot.front.cm();
    if front == 0 || front > PANIC_CM {
        return None;
    }
    if snapshot.left.cm() >= snapshot.right.cm() {
        Some(Side::Left)
    } else {
        Some(Side::Right)
    }
}

#[inline]
fn min_nonzero(a: u16, b: u16) -> u16 {
    match (a, b) {
        (0, b) => b,
        (a, 0) => a,
        (a, b) => a.min(b),
    }
}

/// Strong walls win outright, medium ones are mixed 2:1 with vision
fn blend(obstacle: i32, estimate: i32) -> i32 {
    if obstacle.abs() > OBSTACLE_OVERRIDE {
        obstacle
    } else if obstacle.abs() > OBSTACLE_BLEND {
        (obstacle * 2 + estimate) / 3
    } else {
        estimate
    }
}

#[inline]
fn clamp_steer(steer: i32) -> i32 {
    steer.clamp(-STEER_LIMIT, STEER_LIMIT)
}

/// Vision memory carried from tick to tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FusionState {
    /// Last corrected vision estimate, decaying while vision is lost
    pub last_estimate: i32,
    /// Consecutive ticks without a new estimate
    pub misses: u8,
    /// Pattern of the last estimate
    pub pattern: Pattern,
}

impl Default for FusionState {
    fn default() -> Self {
        Self {
            last_estimate: 0,
            misses: 0,
            pattern: Pattern::Unknown,
        }
    }
}

impl FusionState {
    /// Vision has been silent for longer than the hold window
    pub fn vision_lost(&self) -> bool {
        self.misses > VISION_HOLD_TICKS
    }
}

/// Computes the steering of every autonomous tick
#[derive(Debug, Default)]
pub struct FusionEngine {
    state: FusionState,
}

impl FusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FusionState {
        &self.state
    }

    /// Steering from the side walls alone
    pub fn steer_ultrasonic(&self, snapshot: &RangeSnapshot) -> i32 {
        clamp_steer(obstacle_term(snapshot))
    }

    /// Steering from the side walls fused with the vision reading of this
    /// tick, `None` when the vision core had no new result.
    pub fn steer_fused(&mut self, snapshot: &RangeSnapshot, reading: Option<i32>) -> i32 {
        let obstacle = obstacle_term(snapshot);

        match reading {
            Some(raw) => {
                let pattern = Pattern::classify(raw);
                let estimate = pattern.correct(raw);
                if self.state.vision_lost() {
                    info!("vision recovered after {} ticks", self.state.misses);
                }
                self.state = FusionState {
                    last_estimate: estimate,
                    misses: 0,
                    pattern,
                };

                clamp_steer(blend(obstacle, estimate))
            }
            None => {
                self.state.misses = self.state.misses.saturating_add(1);
                if self.state.vision_lost() {
                    if self.state.misses == VISION_HOLD_TICKS + 1 {
                        warn!("vision lost, steering on ranging only");
                    }
                    let (num, den) = VISION_DECAY;
                    self.state.last_estimate = self.state.last_estimate * num / den;
                    clamp_steer(obstacle)
                } else {
                    self.state.last_estimate
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sides(right: u16, left: u16) -> RangeSnapshot {
        RangeSnapshot::from_cm(200, right, left)
    }

    #[test]
    fn test_obstacle_term() {
        // Nothing in range
        assert_eq!(obstacle_term(&sides(0, 0)), 0);
        assert_eq!(obstacle_term(&sides(120, 51)), 0);

        // Right wall at 45 pushes left: (50 - 45) * 22
        assert_eq!(obstacle_term(&sides(45, 0)), 110);
        // Left wall at 40 pushes right
        assert_eq!(obstacle_term(&sides(0, 40)), -220);
        // Both at 45 cancel
        assert_eq!(obstacle_term(&sides(45, 45)), 0);
    }

    #[test]
    fn test_near_boost_doubles() {
        // Right wall at 30: (50 - 30) * 22 * 2
        assert_eq!(obstacle_term(&sides(30, 0)), 880);
        // Nearest side 35 boosts the sum: (15 - 5) * 22 * 2
        assert_eq!(obstacle_term(&sides(35, 45)), 440);
    }

    #[test]
    fn test_ultrasonic_steer_is_clamped() {
        let engine = FusionEngine::new();
        assert_eq!(engine.steer_ultrasonic(&sides(30, 0)), 80);
        assert_eq!(engine.steer_ultrasonic(&sides(0, 30)), -80);
        assert_eq!(engine.steer_ultrasonic(&sides(0, 0)), 0);
    }

    #[test]
    fn test_speed_bands() {
        assert_eq!(cruise_speed(&RangeSnapshot::from_cm(49, 0, 0)), 30);
        assert_eq!(cruise_speed(&RangeSnapshot::from_cm(50, 0, 0)), 40);
        assert_eq!(cruise_speed(&RangeSnapshot::from_cm(84, 0, 0)), 40);
        assert_eq!(cruise_speed(&RangeSnapshot::from_cm(85, 0, 0)), 50);
        assert_eq!(cruise_speed(&RangeSnapshot::from_cm(0, 0, 0)), 50);
    }

    #[test]
    fn test_emergency_side() {
        assert_eq!(emergency_side(&RangeSnapshot::from_cm(10, 30, 30)), Some(Side::Left));
        assert_eq!(emergency_side(&RangeSnapshot::from_cm(10, 30, 60)), Some(Side::Left));
        assert_eq!(emergency_side(&RangeSnapshot::from_cm(18, 60, 30)), Some(Side::Right));
        assert_eq!(emergency_side(&RangeSnapshot::from_cm(19, 60, 30)), None);
        assert_eq!(emergency_side(&RangeSnapshot::from_cm(0, 60, 30)), None);
    }

    #[test]
    fn test_vision_alone_without_walls() {
        let mut engine = FusionEngine::new();
        assert_eq!(engine.steer_fused(&sides(0, 0), Some(40)), 45);
        assert_eq!(engine.state().pattern, Pattern::LeftCurve);
        assert_eq!(engine.state().last_estimate, 45);
        assert_eq!(engine.steer_fused(&sides(0, 0), Some(20)), 10);
        assert_eq!(engine.state().pattern, Pattern::StartEnd);
    }

    #[test]
    fn test_strong_wall_overrides_vision() {
        let mut engine = FusionEngine::new();
        // Left wall at 48: -44, stronger than the override level
        assert_eq!(engine.steer_fused(&sides(0, 48), Some(40)), -44);
        // The estimate is still remembered
        assert_eq!(engine.state().last_estimate, 45);
    }

    #[test]
    fn test_blend_levels() {
        assert_eq!(blend(22, -40), 22);
        assert_eq!(blend(-21, 40), -21);
        assert_eq!(blend(20, -40), 0);
        assert_eq!(blend(-15, 30), 0);
        assert_eq!(blend(11, 1), 7);
        assert_eq!(blend(10, -40), -40);
        assert_eq!(blend(0, 12), 12);
    }

    #[test]
    fn test_wall_at_threshold_leaves_vision() {
        let mut engine = FusionEngine::new();
        // A wall exactly at the threshold contributes nothing
        assert_eq!(engine.steer_fused(&sides(50, 0), Some(5)), 5);
    }

    #[test]
    fn test_hold_then_decay() {
        let mut engine = FusionEngine::new();
        let walls = sides(45, 0); // obstacle term 110 -> clamped 80
        engine.steer_fused(&sides(0, 0), Some(50)); // left curve, estimate 55

        for miss in 1..=10u8 {
            assert_eq!(engine.steer_fused(&walls, None), 55, "miss {}", miss);
            assert_eq!(engine.state().last_estimate, 55);
            assert_eq!(engine.state().misses, miss);
        }

        // Miss 11: vision lost, walls steer and the memory starts decaying
        assert_eq!(engine.steer_fused(&walls, None), 80);
        assert_eq!(engine.state().last_estimate, 49);
        assert!(engine.state().vision_lost());
        assert_eq!(engine.steer_fused(&walls, None), 80);
        assert_eq!(engine.state().last_estimate, 44);
        assert_eq!(engine.steer_fused(&sides(0, 0), None), 0);
        assert_eq!(engine.state().last_estimate, 39);
    }

    #[test]
    fn test_recovery_resets_misses() {
        let mut engine = FusionEngine::new();
        for _ in 0..15 {
            engine.steer_fused(&sides(0, 0), None);
        }
        assert!(engine.state().vision_lost());
        assert_eq!(engine.steer_fused(&sides(0, 0), Some(-5)), -5);
        assert_eq!(engine.state().misses, 0);
        assert_eq!(engine.state().pattern, Pattern::Straight);
    }
}
