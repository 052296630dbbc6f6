//! Host-side fakes for the hardware collaborators
//!
//! `FakeBus` is a register map shared between clones, so every peripheral
//! block can own its own handle while the test inspects one write log.
//! `FakeDelay` advances a simulated clock instead of sleeping; the bus stamps
//! every write with that clock, which makes timed sequences checkable.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use embedded_hal_async::delay::DelayNs;

use crate::system::error::{Error, Result};
use crate::system::registers::RegisterBus;

/// Simulated time in nanoseconds
pub type Clock = Rc<Cell<u64>>;

/// One register write seen on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    pub at_ns: u64,
    pub addr: u16,
    pub value: u32,
}

#[derive(Default)]
struct BusState {
    registers: HashMap<u16, u32>,
    queued: HashMap<u16, VecDeque<u32>>,
    writes: Vec<Write>,
    fail_next: Option<Error>,
    fail_on: Option<(u16, Error)>,
}

/// Register map standing in for the FPGA fabric
#[derive(Clone)]
pub struct FakeBus {
    state: Rc<RefCell<BusState>>,
    clock: Clock,
}

impl FakeBus {
    pub fn new(clock: Clock) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState::default())),
            clock,
        }
    }

    /// Sets the value every later read of `addr` returns
    pub fn set(&self, addr: u16, value: u32) {
        self.state.borrow_mut().registers.insert(addr, value);
    }

    /// Queues values returned by the next reads of `addr`, before falling back to `set`
    pub fn queue(&self, addr: u16, values: &[u32]) {
        self.state
            .borrow_mut()
            .queued
            .entry(addr)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Makes the next transfer fail
    pub fn fail_next(&self, error: Error) {
        self.state.borrow_mut().fail_next = Some(error);
    }

    /// Makes the next transfer touching `addr` fail
    pub fn fail_on(&self, addr: u16, error: Error) {
        self.state.borrow_mut().fail_on = Some((addr, error));
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.borrow().writes.clone()
    }

    /// Writes to one register, in order
    pub fn writes_to(&self, addr: u16) -> Vec<u32> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| w.addr == addr)
            .map(|w| w.value)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }
}

impl BusState {
    fn take_failure(&mut self, addr: u16) -> Option<Error> {
        if let Some(error) = self.fail_next.take() {
            return Some(error);
        }
        match self.fail_on {
            Some((target, error)) if target == addr => {
                self.fail_on = None;
                Some(error)
            }
            _ => None,
        }
    }
}

impl RegisterBus for FakeBus {
    async fn read(&mut self, addr: u16) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.take_failure(addr) {
            return Err(error);
        }
        if let Some(value) = state.queued.get_mut(&addr).and_then(|q| q.pop_front()) {
            return Ok(value);
        }
        Ok(state.registers.get(&addr).copied().unwrap_or(0))
    }

    async fn write(&mut self, addr: u16, value: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.take_failure(addr) {
            return Err(error);
        }
        state.registers.insert(addr, value);
        state.writes.push(Write {
            at_ns: self.clock.get(),
            addr,
            value,
        });
        Ok(())
    }
}

/// Delay that only advances the simulated clock
pub struct FakeDelay {
    clock: Clock,
}

impl FakeDelay {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.set(self.clock.get() + u64::from(ns));
    }
}

/// Nanoseconds in a millisecond, for readable assertions
pub const MS: u64 = 1_000_000;
