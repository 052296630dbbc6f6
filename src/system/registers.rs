//! Register Access
//!
//! The motor driver, vision accelerator and ultrasonic rangers live in FPGA
//! fabric behind a plain 32-bit register interface. This module holds the bus
//! abstraction the core is written against, the register maps, and small typed
//! wrappers around the bit-packed register values.
//!
//! # Register Maps
//!
//! ## Motor block
//! - `EN` (0x00): one enable bit per channel
//! - `DIR` (0x04): one direction bit per channel, 1 = reverse, after wiring inversion
//! - `DUTY` (0x08): one byte per channel (channel 0 in the lowest byte), 0-100
//!
//! ## Vision core
//! - `CONTROL` (0x00): bit 0 start, bit 1 reset
//! - `STATUS` (0x04): bit 0 result valid, bit 1 busy, bit 2 frame input complete
//! - `RESULT_LO` (0x08) / `RESULT_HI` (0x0C): 48-bit signed fixed-point estimate
//!
//! ## Ultrasonic ranger
//! - `ONES` (0x00) / `TENS` (0x04): decimal digits of the distance, low nibble each

use crate::system::config::DUTY_MAX;
use crate::system::error::Result;

/// 32-bit register bus towards the FPGA fabric
///
/// Addresses are peripheral base plus register offset. Implementations do a
/// single transfer per call and never retry; a failed transfer is reported
/// and the control loop carries on with the next tick.
#[allow(async_fn_in_trait)]
pub trait RegisterBus {
    /// Reads one register
    async fn read(&mut self, addr: u16) -> Result<u32>;

    /// Writes one register
    async fn write(&mut self, addr: u16, value: u32) -> Result<()>;
}

/// Motor block register offsets
pub mod motor {
    pub const EN: u16 = 0x00;
    pub const DIR: u16 = 0x04;
    pub const DUTY: u16 = 0x08;
}

/// Vision core register offsets and bits
pub mod vision {
    pub const CONTROL: u16 = 0x00;
    pub const STATUS: u16 = 0x04;
    pub const RESULT_LO: u16 = 0x08;
    pub const RESULT_HI: u16 = 0x0C;

    /// CONTROL: hold the accelerator in reset
    pub const CONTROL_RESET: u32 = 1 << 1;
}

/// Ultrasonic ranger register offsets
pub mod ranging {
    pub const ONES: u16 = 0x00;
    pub const TENS: u16 = 0x04;
}

/// Physical motor channel, numbered as on the driver board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    FrontRight = 0,
    FrontLeft = 1,
    RearLeft = 2,
    RearRight = 3,
}

impl Channel {
    /// All channels in register order
    pub const ALL: [Channel; 4] = [
        Channel::FrontRight,
        Channel::FrontLeft,
        Channel::RearLeft,
        Channel::RearRight,
    ];

    /// Channels on the left side of the rover
    pub const LEFT: [Channel; 2] = [Channel::FrontLeft, Channel::RearLeft];

    /// Channels on the right side of the rover
    pub const RIGHT: [Channel; 2] = [Channel::FrontRight, Channel::RearRight];

    /// Position of this channel in the bit masks and the duty word
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// `EN` register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnableMask(u8);

impl EnableMask {
    /// Every channel disabled
    pub const NONE: EnableMask = EnableMask(0);
    /// Every channel enabled
    pub const ALL: EnableMask = EnableMask(0x0F);

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_enabled(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }
}

/// `DIR` register value, one reverse bit per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirectionMask(u8);

impl DirectionMask {
    /// All channels forward
    pub const FORWARD: DirectionMask = DirectionMask(0);

    /// Builds a mask from a raw register value, ignoring the unused upper bits
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Marks the given channels as running in reverse
    #[must_use]
    pub fn with_reverse(self, channels: &[Channel]) -> Self {
        let mut bits = self.0;
        for channel in channels {
            bits |= channel.bit();
        }
        Self(bits)
    }

    #[inline]
    pub fn is_reverse(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Corrects the logical directions for motors wired with swapped polarity
    #[must_use]
    pub fn apply_inversion(self, inversion: &[bool; 4]) -> Self {
        let mut bits = self.0;
        for channel in Channel::ALL {
            if inversion[channel.index()] {
                bits ^= channel.bit();
            }
        }
        Self(bits & 0x0F)
    }
}

/// `DUTY` register value, one byte per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyWord(u32);

impl DutyWord {
    /// Packs per-channel duties, clamping each to 0-100
    pub fn from_channels(duties: [u8; 4]) -> Self {
        let word = duties
            .iter()
            .enumerate()
            .fold(0u32, |word, (index, duty)| {
                word | (u32::from((*duty).min(DUTY_MAX)) << (8 * index))
            });
        Self(word)
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Duty of one channel
    #[inline]
    pub fn channel(self, channel: Channel) -> u8 {
        (self.0 >> (8 * channel.index())) as u8
    }
}

/// Vision core `STATUS` register
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VisionStatus {
    raw: u32,
}

impl VisionStatus {
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// A new steering estimate is latched in the result registers
    #[inline]
    pub fn result_valid(&self) -> bool {
        (self.raw & (1 << 0)) != 0
    }

    /// Inference is running
    #[inline]
    pub fn busy(&self) -> bool {
        (self.raw & (1 << 1)) != 0
    }

    /// The current camera frame has been fully received
    #[inline]
    pub fn frame_done(&self) -> bool {
        (self.raw & (1 << 2)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::config::WHEEL_INVERSION;

    #[test]
    fn test_inversion_flips_only_marked_wheels() {
        let forward = DirectionMask::FORWARD.apply_inversion(&WHEEL_INVERSION);
        assert!(forward.is_reverse(Channel::FrontRight));
        assert!(!forward.is_reverse(Channel::FrontLeft));
        assert!(forward.is_reverse(Channel::RearLeft));
        assert!(!forward.is_reverse(Channel::RearRight));

        let reverse = DirectionMask::FORWARD
            .with_reverse(&Channel::ALL)
            .apply_inversion(&WHEEL_INVERSION);
        assert_eq!(reverse.bits(), 0b1010);
    }

    #[test]
    fn test_left_side_reverse_bits() {
        let mask = DirectionMask::FORWARD.with_reverse(&Channel::LEFT);
        assert_eq!(mask.bits(), 0b0110);
        assert_eq!(DirectionMask::from_bits(0xF5).bits(), 0x05);
    }

    #[test]
    fn test_duty_word_layout() {
        let word = DutyWord::from_channels([10, 20, 30, 40]);
        assert_eq!(word.bits(), 0x281E_140A);
        assert_eq!(word.channel(Channel::RearLeft), 30);
    }

    #[test]
    fn test_duty_word_clamps_each_channel() {
        let word = DutyWord::from_channels([255, 101, 100, 0]);
        assert_eq!(word.channel(Channel::FrontRight), 100);
        assert_eq!(word.channel(Channel::FrontLeft), 100);
        assert_eq!(word.channel(Channel::RearLeft), 100);
        assert_eq!(word.channel(Channel::RearRight), 0);
    }

    #[test]
    fn test_vision_status_bits() {
        let status = VisionStatus::from_raw(0b101);
        assert!(status.result_valid());
        assert!(!status.busy());
        assert!(status.frame_done());
        assert!(!VisionStatus::from_raw(0b010).result_valid());
    }

    #[test]
    fn test_enable_mask() {
        assert!(EnableMask::ALL.is_enabled(Channel::RearRight));
        assert!(!EnableMask::NONE.is_enabled(Channel::FrontLeft));
        assert_eq!(EnableMask::ALL.bits(), 0x0F);
    }
}
