//! Vision Core
//!
//! The vision accelerator classifies the camera frame and latches a steering
//! estimate in two result registers. Reads are non-blocking: when no new
//! result is latched the core reports nothing and the fusion engine decides
//! how to live with the gap.
//!
//! # Result Format
//! The result is a 48-bit signed fixed-point value, low 32 bits in `RESULT_LO`
//! and high 16 bits in the low half of `RESULT_HI`. Dividing by
//! `VISION_SCALE` yields steering units, clamped to -80..=80.

use embedded_hal_async::delay::DelayNs;

use crate::system::config::{
    CURVE_BIAS, PATTERN_CURVE_MIN, PATTERN_STRAIGHT_MAX, STEER_LIMIT, VISION_RESET_MS,
    VISION_SCALE,
};
use crate::system::error::Result;
use crate::system::registers::{vision, RegisterBus, VisionStatus};

/// Lane shape recognized from a steering estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pattern {
    Straight,
    LeftCurve,
    RightCurve,
    /// Start or finish marker on the track
    StartEnd,
    /// Nothing classified yet
    Unknown,
}

impl Pattern {
    /// Classifies a steering estimate by magnitude and sign
    pub fn classify(estimate: i32) -> Self {
        if estimate.abs() < PATTERN_STRAIGHT_MAX {
            Pattern::Straight
        } else if estimate > PATTERN_CURVE_MIN {
            Pattern::LeftCurve
        } else if estimate < -PATTERN_CURVE_MIN {
            Pattern::RightCurve
        } else {
            Pattern::StartEnd
        }
    }

    /// Pattern-specific steering correction: curves are steered a little
    /// harder, markers are softened to smooth the transition.
    pub fn correct(self, estimate: i32) -> i32 {
        let corrected = match self {
            Pattern::Straight => estimate,
            Pattern::LeftCurve => estimate + CURVE_BIAS,
            Pattern::RightCurve => estimate - CURVE_BIAS,
            Pattern::StartEnd => estimate / 2,
            Pattern::Unknown => 0,
        };
        corrected.clamp(-STEER_LIMIT, STEER_LIMIT)
    }
}

/// Register-level access to the vision accelerator
pub struct VisionCore<B> {
    bus: B,
    base: u16,
}

impl<B: RegisterBus> VisionCore<B> {
    pub fn new(bus: B, base: u16) -> Self {
        Self { bus, base }
    }

    /// Pulses the reset bit of the accelerator
    pub async fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<()> {
        self.bus
            .write(self.base + vision::CONTROL, vision::CONTROL_RESET)
            .await?;
        delay.delay_ms(VISION_RESET_MS).await;
        self.bus.write(self.base + vision::CONTROL, 0).await
    }

    pub async fn status(&mut self) -> Result<VisionStatus> {
        let raw = self.bus.read(self.base + vision::STATUS).await?;
        Ok(VisionStatus::from_raw(raw))
    }

    /// Reads the latest steering estimate, if a new one is latched.
    ///
    /// An estimate of exactly zero is indistinguishable from "no result" on
    /// this accelerator and is reported as `None` as well.
    pub async fn read_steering(&mut self) -> Result<Option<i32>> {
        if !self.status().await?.result_valid() {
            return Ok(None);
        }

        let low = self.bus.read(self.base + vision::RESULT_LO).await?;
        let high = self.bus.read(self.base + vision::RESULT_HI).await? & 0xFFFF;

        let steering = to_steering(low, high);
        Ok((steering != 0).then_some(steering))
    }
}

/// Converts the two result words to clamped steering units
fn to_steering(low: u32, high: u32) -> i32 {
    let raw = (u64::from(high) << 32) | u64::from(low);
    // Sign-extend from bit 47
    let raw = ((raw << 16) as i64) >> 16;
    (raw / VISION_SCALE).clamp(i64::from(-STEER_LIMIT), i64::from(STEER_LIMIT)) as i32
}
