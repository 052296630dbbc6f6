//! Ultrasonic Ranging
//!
//! Three ultrasonic rangers (front, right, left) in FPGA fabric, each exposing
//! the measured distance as two decimal digit registers.
//!
//! # Signal Processing
//! - Each tick takes `RANGE_SAMPLES` samples per sensor, `RANGE_SAMPLE_SPACING_MS` apart
//! - Samples outside 1-400 cm are implausible and dropped
//! - The remaining samples are averaged
//!
//! # No Echo
//! A sensor with no plausible sample in its window reports `NoEcho`. The
//! steering arithmetic treats that as distance 0, "nothing detected", which
//! never triggers avoidance. That is also what a dead sensor looks like, so
//! the snapshot keeps `NoEcho` distinct and the controller logs blind sensors.

use embedded_hal_async::delay::DelayNs;

use crate::system::config::{RANGE_MAX_CM, RANGE_MIN_CM, RANGE_SAMPLES, RANGE_SAMPLE_SPACING_MS};
use crate::system::error::Result;
use crate::system::registers::{ranging, RegisterBus};

/// Averaged reading of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeSample {
    /// Plausible distance in centimeters
    Echo(u16),
    /// No plausible sample in the averaging window
    NoEcho,
}

impl RangeSample {
    /// Distance in centimeters, 0 when there was no echo
    #[inline]
    pub fn cm(self) -> u16 {
        match self {
            RangeSample::Echo(cm) => cm,
            RangeSample::NoEcho => 0,
        }
    }
}

/// Distances around the rover for one control tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangeSnapshot {
    pub front: RangeSample,
    pub right: RangeSample,
    pub left: RangeSample,
}

impl RangeSnapshot {
    /// Builds a snapshot from centimeters, 0 meaning no echo
    pub fn from_cm(front: u16, right: u16, left: u16) -> Self {
        let sample = |cm: u16| {
            if cm == 0 {
                RangeSample::NoEcho
            } else {
                RangeSample::Echo(cm)
            }
        };
        Self {
            front: sample(front),
            right: sample(right),
            left: sample(left),
        }
    }

    /// Number of sensors without an echo this tick
    pub fn blind_sensors(&self) -> u8 {
        [self.front, self.right, self.left]
            .iter()
            .filter(|sample| **sample == RangeSample::NoEcho)
            .count() as u8
    }
}

/// One ultrasonic ranger
pub struct RangeSensor<B> {
    bus: B,
    base: u16,
}

impl<B: RegisterBus> RangeSensor<B> {
    pub fn new(bus: B, base: u16) -> Self {
        Self { bus, base }
    }

    /// Reads the two digit registers once
    pub async fn read_once(&mut self) -> Result<u16> {
        let ones = self.bus.read(self.base + ranging::ONES).await? & 0xF;
        let tens = self.bus.read(self.base + ranging::TENS).await? & 0xF;
        Ok((tens * 10 + ones) as u16)
    }

    /// Averages the plausible samples of one window
    pub async fn read_average<D: DelayNs>(&mut self, delay: &mut D) -> Result<RangeSample> {
        let mut sum = 0u32;
        let mut count = 0u32;
        for _ in 0..RANGE_SAMPLES {
            let cm = self.read_once().await?;
            if (RANGE_MIN_CM..=RANGE_MAX_CM).contains(&cm) {
                sum += u32::from(cm);
                count += 1;
            }
            delay.delay_ms(RANGE_SAMPLE_SPACING_MS).await;
        }

        Ok(if count > 0 {
            RangeSample::Echo((sum / count) as u16)
        } else {
            RangeSample::NoEcho
        })
    }
}

/// The three rangers of the rover
pub struct Rangefinders<B> {
    pub front: RangeSensor<B>,
    pub right: RangeSensor<B>,
    pub left: RangeSensor<B>,
}

impl<B: RegisterBus> Rangefinders<B> {
    /// Reads front, right and left, in that order
    pub async fn snapshot<D: DelayNs>(&mut self, delay: &mut D) -> Result<RangeSnapshot> {
        let front = self.front.read_average(delay).await?;
        let right = self.right.read_average(delay).await?;
        let left = self.left.read_average(delay).await?;
        Ok(RangeSnapshot { front, right, left })
    }
}
