//! Wheel Actuation
//!
//! Realizes a left/right duty pair on the four motor channels of the FPGA
//! motor block. Both wheels of a side are driven identically.
//!
//! # Write Sequence
//! Every command disables the outputs, waits out the bridge dead time, then
//! writes the direction bits, the packed duties, and re-enables. Direction
//! bits never change while a channel is driven, which rules out shoot-through.
//!
//! # Kick-Start
//! Starting from rest, or targeting a duty at or below `DUTY_MIN_TURN`, the
//! command is preceded by a short pulse at `KICK_DUTY` to break static
//! friction. The pulse is a cooperative suspension point: the control loop
//! awaits it and does not poll input meanwhile.
//!
//! # Change Deadband
//! Forward and backward commands whose duties both differ from the last
//! applied command by less than `DUTY_DEADBAND` are dropped entirely, kick
//! included, so sensor noise does not chatter the outputs. A change of
//! direction is always applied; stops and spins forget the last applied duties.

use embedded_hal_async::delay::DelayNs;

use crate::system::config::{
    DEAD_TIME_US, DUTY_DEADBAND, DUTY_MIN_TURN, KICK_DUTY, KICK_MS, SPIN_DUTY, SPIN_LEFT_REVERSED,
    SPIN_RIGHT_REVERSED, WHEEL_INVERSION,
};
use crate::system::duty::SideDuty;
use crate::system::error::Result;
use crate::system::registers::{motor, Channel, DirectionMask, DutyWord, EnableMask, RegisterBus};
use crate::system::state::Motion;

/// Test pattern written to `DIR` by the startup probe
const PROBE_PATTERN: u32 = 0x5;

/// One complete motor block command, built fresh for every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelCommand {
    pub enable: EnableMask,
    /// Logical directions, before the wiring inversion
    pub direction: DirectionMask,
    /// Duty per channel, 0-100
    pub duty: [u8; 4],
}

impl WheelCommand {
    /// Same duty and direction for both wheels of each side
    pub fn sides(duty: SideDuty, reverse: bool) -> Self {
        let mut duties = [0u8; 4];
        for channel in Channel::LEFT {
            duties[channel.index()] = duty.left;
        }
        for channel in Channel::RIGHT {
            duties[channel.index()] = duty.right;
        }
        let direction = if reverse {
            DirectionMask::FORWARD.with_reverse(&Channel::ALL)
        } else {
            DirectionMask::FORWARD
        };
        Self {
            enable: EnableMask::ALL,
            direction,
            duty: duties,
        }
    }

    /// All channels at `duty`, directions set for turning in place
    pub fn spin(left: bool, duty: u8) -> Self {
        let reversed = if left {
            &SPIN_LEFT_REVERSED
        } else {
            &SPIN_RIGHT_REVERSED
        };
        Self {
            enable: EnableMask::ALL,
            direction: DirectionMask::FORWARD.with_reverse(reversed),
            duty: [duty; 4],
        }
    }

    /// This command with every channel at `duty`, for the kick pulse
    #[must_use]
    pub fn with_duty(self, duty: u8) -> Self {
        Self {
            duty: [duty; 4],
            ..self
        }
    }
}

/// Register-level access to the FPGA motor block
pub struct MotorBlock<B> {
    bus: B,
    base: u16,
}

impl<B: RegisterBus> MotorBlock<B> {
    pub fn new(bus: B, base: u16) -> Self {
        Self { bus, base }
    }

    /// Writes a command with the dead-time sequence
    pub async fn write<D: DelayNs>(&mut self, command: &WheelCommand, delay: &mut D) -> Result<()> {
        self.disable().await?;
        delay.delay_us(DEAD_TIME_US).await;

        let direction = command.direction.apply_inversion(&WHEEL_INVERSION);
        self.bus
            .write(self.base + motor::DIR, u32::from(direction.bits()))
            .await?;
        self.bus
            .write(
                self.base + motor::DUTY,
                DutyWord::from_channels(command.duty).bits(),
            )
            .await?;
        self.bus
            .write(self.base + motor::EN, u32::from(command.enable.bits()))
            .await
    }

    /// Disables every channel at once
    pub async fn disable(&mut self) -> Result<()> {
        self.bus
            .write(self.base + motor::EN, u32::from(EnableMask::NONE.bits()))
            .await
    }

    /// Checks that the direction register is writable, then restores it.
    ///
    /// Returns the value before and after writing the test pattern.
    pub async fn probe_direction(&mut self) -> Result<(u32, u32)> {
        let before = self.bus.read(self.base + motor::DIR).await?;
        self.bus.write(self.base + motor::DIR, PROBE_PATTERN).await?;
        let after = self.bus.read(self.base + motor::DIR).await?;
        self.bus.write(self.base + motor::DIR, before).await?;
        Ok((before, after))
    }
}

/// Duties and direction of the last forward/backward command written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Applied {
    pub duty: SideDuty,
    pub reverse: bool,
}

/// What the driver did with a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Actuation {
    /// Within the deadband of the last command, nothing written
    Suppressed,
    /// Written, optionally preceded by a kick pulse
    Applied { kicked: bool },
}

/// Drives the motor block, remembering what it last applied
pub struct WheelDriver<B> {
    motors: MotorBlock<B>,
    last_applied: Option<Applied>,
    motion: Motion,
}

impl<B: RegisterBus> WheelDriver<B> {
    pub fn new(motors: MotorBlock<B>) -> Self {
        Self {
            motors,
            last_applied: None,
            motion: Motion::Stopped,
        }
    }

    /// Last applied forward/backward duties, `None` when unset
    pub fn last_applied(&self) -> Option<Applied> {
        self.last_applied
    }

    /// Motion currently realized on the wheels
    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn motors(&mut self) -> &mut MotorBlock<B> {
        &mut self.motors
    }

    /// Drives both sides forward or backward at the given duties
    pub async fn drive<D: DelayNs>(
        &mut self,
        duty: SideDuty,
        reverse: bool,
        delay: &mut D,
    ) -> Result<Actuation> {
        let duty = SideDuty {
            left: duty.left.min(100),
            right: duty.right.min(100),
        };

        if let Some(last) = self.last_applied {
            if last.reverse == reverse
                && last.duty.left.abs_diff(duty.left) < DUTY_DEADBAND
                && last.duty.right.abs_diff(duty.right) < DUTY_DEADBAND
            {
                return Ok(Actuation::Suppressed);
            }
        }

        let command = WheelCommand::sides(duty, reverse);
        let moving = duty.left > 0 || duty.right > 0;
        let low_duty = duty.left <= DUTY_MIN_TURN || duty.right <= DUTY_MIN_TURN;
        let kicked = moving && (self.motion == Motion::Stopped || low_duty);

        if kicked {
            debug!("kick before L={} R={}", duty.left, duty.right);
            self.kick(&command, delay).await?;
        }
        self.motors.write(&command, delay).await?;

        self.last_applied = Some(Applied { duty, reverse });
        self.motion = if reverse {
            Motion::Backward
        } else {
            Motion::Forward
        };
        Ok(Actuation::Applied { kicked })
    }

    /// Turns in place at the fixed spin duty
    pub async fn spin<D: DelayNs>(&mut self, left: bool, delay: &mut D) -> Result<Actuation> {
        let command = WheelCommand::spin(left, SPIN_DUTY);
        let kicked = self.motion == Motion::Stopped;
        if kicked {
            self.kick(&command, delay).await?;
        }
        self.motors.write(&command, delay).await?;

        self.last_applied = None;
        self.motion = if left {
            Motion::SpinLeft
        } else {
            Motion::SpinRight
        };
        Ok(Actuation::Applied { kicked })
    }

    /// Disables all outputs immediately
    pub async fn stop(&mut self) -> Result<()> {
        self.last_applied = None;
        self.motion = Motion::Stopped;
        self.motors.disable().await
    }

    async fn kick<D: DelayNs>(&mut self, command: &WheelCommand, delay: &mut D) -> Result<()> {
        self.motors.write(&command.with_duty(KICK_DUTY), delay).await?;
        delay.delay_ms(KICK_MS).await;
        Ok(())
    }
}
