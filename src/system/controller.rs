//! Motion Controller
//!
//! Top-level owner of the rover's state. It applies decoded commands, runs the
//! autonomous control tick and sequences the emergency maneuver. Everything is
//! driven from one cooperative loop:
//!
//! ```text
//!   loop every ~1 ms
//!     drain serial bytes  -> handle_byte -> apply
//!     step                -> every TICK_MS in an autonomous mode:
//!                              ranging snapshot
//!                              front inside PANIC_CM -> emergency maneuver
//!                              speed band + fusion steer -> forward drive
//! ```
//!
//! Hardware errors never stop the loop. They are logged and the next byte or
//! tick starts from the current state again.
//!
//! The kick pulse and the emergency maneuver suspend the loop cooperatively,
//! so no input is read while they run. The only way into a running maneuver
//! is the cancel flag, which the serial reader raises on a stop key and the
//! maneuver checks between its spin steps.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal_async::delay::DelayNs;

use crate::system::command_decoder::CommandDecoder;
use crate::system::config::{
    AUTO_BASE_PCT, BACKUP_MS, BACKUP_PCT, DUTY_MIN_TURN, REPORT_EVERY_TICKS, SPIN_STEPS,
    SPIN_STEP_MS, TICK_MS,
};
use crate::system::drive_command::Command;
use crate::system::duty::synthesize;
use crate::system::error::Result;
use crate::system::fusion::{cruise_speed, emergency_side, FusionEngine, Side};
use crate::system::ranging::{RangeSnapshot, Rangefinders};
use crate::system::registers::RegisterBus;
use crate::system::state::{DriveState, Motion, MotionMode};
use crate::system::vision::VisionCore;
use crate::system::wheels::{MotorBlock, WheelDriver};

/// Peripheral blocks the controller drives
pub struct Hardware<B> {
    pub motors: MotorBlock<B>,
    pub vision: VisionCore<B>,
    pub ranging: Rangefinders<B>,
}

/// How a control tick ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Fusion steered, forward drive re-issued
    Steered,
    /// Emergency maneuver ran to completion, cruising forward again
    Evaded(Side),
    /// Emergency maneuver cancelled by a stop request, rover stopped
    Cancelled,
}

/// The rover: drive state plus the collaborators that realize it
pub struct Rover<B, D> {
    state: DriveState,
    fusion: FusionEngine,
    decoder: CommandDecoder,
    wheels: WheelDriver<B>,
    vision: VisionCore<B>,
    ranging: Rangefinders<B>,
    delay: D,
    /// Loop iterations since the last control tick, about one per millisecond
    tick_ms: u32,
    /// Control ticks since the last autonomous report
    report_ticks: u8,
    /// Blind sensors seen by the last snapshot
    blind: u8,
}

impl<B, D> Rover<B, D>
where
    B: RegisterBus,
    D: DelayNs,
{
    pub fn new(hardware: Hardware<B>, delay: D) -> Self {
        Self {
            state: DriveState::default(),
            fusion: FusionEngine::new(),
            decoder: CommandDecoder::new(),
            wheels: WheelDriver::new(hardware.motors),
            vision: hardware.vision,
            ranging: hardware.ranging,
            delay,
            tick_ms: 0,
            report_ticks: 0,
            blind: 0,
        }
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }

    pub fn wheels(&self) -> &WheelDriver<B> {
        &self.wheels
    }

    /// Brings the hardware into its safe startup state.
    ///
    /// Each step is attempted even when an earlier one failed, the rover must
    /// end up stopped regardless.
    pub async fn init(&mut self) {
        log_help();

        match self.vision.reset(&mut self.delay).await {
            Ok(()) => info!("vision core reset"),
            Err(e) => error!("vision core reset failed: {}", e),
        }

        match self.wheels.motors().probe_direction().await {
            Ok((before, after)) if before == after => {
                warn!("DIR probe unchanged {=u32:#x}, motor block not responding", after)
            }
            Ok((before, after)) => info!("DIR probe before={=u32:#x} after={=u32:#x}", before, after),
            Err(e) => error!("DIR probe failed: {}", e),
        }

        self.state = DriveState::default();
        if let Err(e) = self.stop().await {
            error!("initial stop failed: {}", e);
        }
        info!("rover ready, speed={} steer={}", self.state.speed_pct(), self.state.steer());
    }

    /// Feeds one serial byte through the decoder and applies what it yields
    pub async fn handle_byte(&mut self, byte: u8) {
        let decoded = self.decoder.push(byte);
        if let Some(command) = decoded.command {
            if let Err(e) = self.apply(command).await {
                error!("{} failed: {}", command, e);
            }
        }
    }

    /// Applies one drive command
    pub async fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Forward => self.enter(MotionMode::ManualForward).await,
            Command::Backward => self.enter(MotionMode::ManualBackward).await,
            Command::SpinLeft => self.enter(MotionMode::SpinLeft).await,
            Command::SpinRight => self.enter(MotionMode::SpinRight).await,
            Command::Stop => self.stop().await,
            Command::AutoUltrasonic | Command::AutoFused => {
                let mode = if command == Command::AutoFused {
                    MotionMode::AutoFused
                } else {
                    MotionMode::AutoUltrasonic
                };
                self.state.mode = mode;
                self.state.set_speed(i32::from(AUTO_BASE_PCT));
                self.state.set_steer(0);
                self.tick_ms = 0;
                self.report_ticks = 0;
                info!("{} at {}%", mode, AUTO_BASE_PCT);
                self.drive(false).await
            }
            Command::SpeedStep(step) => self.nudge(step).await,
            Command::Status => {
                self.log_status();
                let vision = self.vision.status().await?;
                info!(
                    "vision core: result={} busy={} frame={} status={:#x}",
                    vision.result_valid(),
                    vision.busy(),
                    vision.frame_done(),
                    vision.raw()
                );
                Ok(())
            }
            Command::Help => {
                log_help();
                Ok(())
            }
            Command::Set { speed, steer } => {
                self.state.set_steer(steer);
                self.state.set_speed(speed.abs());
                let mode = match speed {
                    s if s > 0 => MotionMode::ManualForward,
                    s if s < 0 => MotionMode::ManualBackward,
                    _ => MotionMode::Stopped,
                };
                info!("set speed={} steer={} -> {}", speed, self.state.steer(), mode);
                self.enter(mode).await
            }
        }
    }

    /// One pass of the superloop after the input was drained.
    ///
    /// Runs a control tick once `TICK_MS` iterations have accumulated in an
    /// autonomous mode. Returns the outcome when a tick ran.
    pub async fn step(&mut self, cancel: &AtomicBool) -> Option<TickOutcome> {
        self.tick_ms = self.tick_ms.saturating_add(1);
        if !self.state.mode.is_autonomous() || self.tick_ms < TICK_MS {
            return None;
        }
        self.tick_ms = 0;

        match self.control_tick(cancel).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("control tick failed: {}", e);
                None
            }
        }
    }

    /// One autonomous control cycle
    pub async fn control_tick(&mut self, cancel: &AtomicBool) -> Result<TickOutcome> {
        let snapshot = self.ranging.snapshot(&mut self.delay).await?;
        self.watch_blind_sensors(&snapshot);

        if let Some(side) = emergency_side(&snapshot) {
            return self.evade(side, cancel).await;
        }

        self.state.set_speed(i32::from(cruise_speed(&snapshot)));
        let steer = if self.state.mode.uses_vision() {
            let reading = match self.vision.read_steering().await {
                Ok(reading) => reading,
                Err(e) => {
                    // Counts as a missed frame
                    error!("vision read failed: {}", e);
                    None
                }
            };
            self.fusion.steer_fused(&snapshot, reading)
        } else {
            self.fusion.steer_ultrasonic(&snapshot)
        };
        self.state.set_steer(steer);
        self.drive(false).await?;

        self.report_ticks = self.report_ticks.saturating_add(1);
        if self.report_ticks >= REPORT_EVERY_TICKS {
            self.report_ticks = 0;
            self.log_report(&snapshot);
        }
        Ok(TickOutcome::Steered)
    }

    /// Reverse, spin towards the clearer side, then cruise forward again
    async fn evade(&mut self, side: Side, cancel: &AtomicBool) -> Result<TickOutcome> {
        warn!("obstacle ahead, evading {}", side);

        self.state.set_speed(i32::from(BACKUP_PCT));
        self.state.set_steer(0);
        self.drive(true).await?;
        self.delay.delay_ms(BACKUP_MS).await;

        self.wheels.spin(side == Side::Left, &mut self.delay).await?;
        for _ in 0..SPIN_STEPS {
            if cancel.load(Ordering::Relaxed) {
                info!("evasion cancelled");
                self.stop().await?;
                return Ok(TickOutcome::Cancelled);
            }
            self.delay.delay_ms(SPIN_STEP_MS).await;
        }

        self.state.set_speed(i32::from(AUTO_BASE_PCT));
        self.state.set_steer(0);
        self.drive(false).await?;
        info!("evasion done");
        Ok(TickOutcome::Evaded(side))
    }

    /// Speed nudge: leaves autonomy and repeats the current motion at the new speed
    async fn nudge(&mut self, step: i32) -> Result<()> {
        let speed = i32::from(self.state.speed_pct()) + step;
        let speed = if speed != 0 {
            speed.clamp(i32::from(DUTY_MIN_TURN), 100)
        } else {
            0
        };
        self.state.set_speed(speed);
        info!("speed={} steer={}", self.state.speed_pct(), self.state.steer());

        let motion = self.state.mode.motion();
        self.state.mode = motion.manual_mode();
        if motion == Motion::Stopped {
            return Ok(());
        }
        self.realize(motion).await
    }

    async fn enter(&mut self, mode: MotionMode) -> Result<()> {
        if mode != self.state.mode {
            debug!("mode {} -> {}", self.state.mode, mode);
        }
        self.state.mode = mode;
        self.realize(mode.motion()).await
    }

    async fn realize(&mut self, motion: Motion) -> Result<()> {
        match motion {
            Motion::Stopped => self.wheels.stop().await,
            Motion::Forward => self.drive(false).await,
            Motion::Backward => self.drive(true).await,
            Motion::SpinLeft => self.wheels.spin(true, &mut self.delay).await.map(|_| ()),
            Motion::SpinRight => self.wheels.spin(false, &mut self.delay).await.map(|_| ()),
        }
    }

    async fn drive(&mut self, reverse: bool) -> Result<()> {
        let duty = synthesize(self.state.speed_pct(), self.state.steer());
        self.wheels.drive(duty, reverse, &mut self.delay).await?;
        Ok(())
    }

    /// Disables every output and leaves any autonomous mode
    async fn stop(&mut self) -> Result<()> {
        self.state.mode = MotionMode::Stopped;
        info!("stop");
        self.wheels.stop().await
    }

    fn watch_blind_sensors(&mut self, snapshot: &RangeSnapshot) {
        let blind = snapshot.blind_sensors();
        if blind != self.blind {
            if blind > 0 {
                warn!("{} ranging sensor(s) without echo: {}", blind, snapshot);
            } else {
                info!("all ranging sensors echo again");
            }
            self.blind = blind;
        }
    }

    fn log_report(&self, snapshot: &RangeSnapshot) {
        if self.state.mode.uses_vision() {
            let fusion = self.fusion.state();
            info!(
                "[fused] F={} R={} L={} | speed={} steer={} | vision={} ({}) misses={}",
                snapshot.front.cm(),
                snapshot.right.cm(),
                snapshot.left.cm(),
                self.state.speed_pct(),
                self.state.steer(),
                fusion.last_estimate,
                fusion.pattern,
                fusion.misses
            );
        } else {
            info!(
                "[ultrasonic] F={} R={} L={} | speed={} steer={}",
                snapshot.front.cm(),
                snapshot.right.cm(),
                snapshot.left.cm(),
                self.state.speed_pct(),
                self.state.steer()
            );
        }
    }

    fn log_status(&self) {
        info!(
            "mode={} speed={} steer={} motion={} last={} fusion={}",
            self.state.mode,
            self.state.speed_pct(),
            self.state.steer(),
            self.wheels.motion(),
            self.wheels.last_applied(),
            self.fusion.state()
        );
    }
}

fn log_help() {
    info!("keys: W fwd, S/R back, A/D spin, X/space stop, Z auto, Y auto+vision");
    info!("keys: +/- speed 10, ? status, H help, C <speed> <steer> set");
}
