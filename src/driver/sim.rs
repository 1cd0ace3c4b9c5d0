//! Simulated peripherals for host-side unit tests.
//!
//! Resets unwind with a [`SimulatedReset`] payload, see [`expect_reset()`].

use core::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

use crate::driver::{
    clock::LfClock,
    cpu::{CooperativeSubsystem, Cpu},
    handshake::{RetainedRegister, RetainedWord},
    power::{PowerMonitor, PowerThresholds, ResetReason, SafeModeHandler},
    sleep::FpuInterrupt,
    timer::{RtcCounter, RtcEvent, TickConfig, TickHook},
};

#[derive(Debug, Default)]
pub struct SimClock {
    running: Cell<bool>,
    starts: Cell<u32>,
}

impl SimClock {
    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn running() -> Self {
        let clock = Self::default();
        clock.running.set(true);
        clock
    }

    pub fn start_count(&self) -> u32 {
        self.starts.get()
    }
}

impl LfClock for SimClock {
    fn is_running(&self) -> bool {
        self.running.get()
    }

    fn start(&self) {
        self.starts.set(self.starts.get() + 1);
        self.running.set(true);
    }
}

/// A wrap-around counter advanced manually with [`SimRtc::step()`].
#[derive(Default)]
pub struct SimRtc {
    mask: u32,
    counter: Cell<u32>,
    running: Cell<bool>,
    unmasked: Cell<bool>,
    configured: Cell<Option<TickConfig>>,

    overflow_enabled: Cell<bool>,
    overflow_pending: Cell<bool>,
    tick_enabled: Cell<bool>,
    tick_pending: Cell<bool>,
    compare: Cell<Option<u32>>,
    compare_pending: Cell<bool>,
    compare_events: Cell<u32>,

    counter_reads: Cell<u32>,
    preempt: Cell<Option<&'static dyn Fn()>>,
}

impl SimRtc {
    pub fn new(counter_bits: u32) -> Self {
        Self {
            mask: ((1u64 << counter_bits) - 1) as u32,
            ..Default::default()
        }
    }

    pub fn set_counter(&self, value: u32) {
        self.counter.set(value & self.mask);
    }

    /// Advances the counter by one subtick and raises the resulting events.
    pub fn step(&self) {
        let next = self.counter.get().wrapping_add(1) & self.mask;
        self.counter.set(next);

        if next == 0 && self.overflow_enabled.get() {
            self.overflow_pending.set(true);
        }
        if self.tick_enabled.get() {
            self.tick_pending.set(true);
        }
        if self.compare.get() == Some(next) {
            self.compare_pending.set(true);
            self.compare_events.set(self.compare_events.get() + 1);
        }
    }

    /// Runs `f` right after the next counter read, emulating an interrupt
    /// that preempts the reader.
    pub fn on_next_counter_read(&self, f: &'static dyn Fn()) {
        self.preempt.set(Some(f));
    }

    pub fn counter_reads(&self) -> u32 {
        self.counter_reads.get()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn is_unmasked(&self) -> bool {
        self.unmasked.get()
    }

    pub fn configured(&self) -> Option<TickConfig> {
        self.configured.get()
    }

    pub fn is_overflow_interrupt_enabled(&self) -> bool {
        self.overflow_enabled.get()
    }

    pub fn is_tick_interrupt_enabled(&self) -> bool {
        self.tick_enabled.get()
    }

    /// Number of compare matches so far.
    pub fn compare_events(&self) -> u32 {
        self.compare_events.get()
    }
}

impl RtcCounter for SimRtc {
    fn configure(&self, config: &TickConfig) {
        self.configured.set(Some(*config));
    }

    fn clear(&self) {
        self.counter.set(0);
    }

    fn start(&self) {
        self.running.set(true);
    }

    fn clear_events(&self) {
        self.overflow_pending.set(false);
        self.tick_pending.set(false);
        self.compare_pending.set(false);
    }

    fn counter(&self) -> u32 {
        self.counter_reads.set(self.counter_reads.get() + 1);
        let value = self.counter.get();
        if let Some(preempt) = self.preempt.take() {
            preempt();
        }
        value
    }

    fn set_overflow_interrupt(&self, enabled: bool) {
        self.overflow_enabled.set(enabled);
    }

    fn is_overflow_pending(&self) -> bool {
        self.overflow_pending.get()
    }

    fn set_tick_interrupt(&self, enabled: bool) {
        self.tick_enabled.set(enabled);
    }

    fn arm_compare(&self, value: u32) {
        self.compare_pending.set(false);
        self.compare.set(Some(value));
    }

    fn disarm_compare(&self) {
        self.compare.set(None);
        self.compare_pending.set(false);
    }

    fn armed_compare(&self) -> Option<u32> {
        self.compare.get()
    }

    fn take_event(&self) -> Option<RtcEvent> {
        if self.overflow_enabled.get() && self.overflow_pending.replace(false) {
            Some(RtcEvent::Overflow)
        } else if self.tick_enabled.get() && self.tick_pending.replace(false) {
            Some(RtcEvent::Tick)
        } else if self.compare_pending.replace(false) {
            Some(RtcEvent::Compare)
        } else {
            None
        }
    }

    fn unmask_interrupt(&self) {
        self.unmasked.set(true);
    }
}

#[derive(Debug, Default)]
pub struct CountingHook(Cell<u32>);

impl CountingHook {
    pub fn count(&self) -> u32 {
        self.0.get()
    }
}

impl TickHook for CountingHook {
    fn on_tick(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Unwind payload of a simulated reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulatedReset {
    Bare,
    Cooperative,
}

/// Runs `f` and returns the reset it performed. Panics if `f` returns.
pub fn expect_reset(f: impl FnOnce()) -> SimulatedReset {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("expected a reset"),
        Err(payload) => match payload.downcast::<SimulatedReset>() {
            Ok(reset) => *reset,
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuCall {
    ClearFpu,
    WaitForInterrupt,
    SystemReset,
}

#[derive(Default)]
pub struct SimCpu {
    calls: RefCell<Vec<CpuCall>>,
    on_wait: Cell<Option<&'static dyn Fn()>>,
}

impl SimCpu {
    pub fn calls(&self) -> Vec<CpuCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: CpuCall) {
        self.calls.borrow_mut().push(call);
    }

    /// Runs `f` on every wait, emulating what happens while the CPU sleeps.
    pub fn while_waiting(&self, f: &'static dyn Fn()) {
        self.on_wait.set(Some(f));
    }
}

impl Cpu for SimCpu {
    fn wait_for_interrupt(&self) {
        self.record(CpuCall::WaitForInterrupt);
        if let Some(f) = self.on_wait.get() {
            f();
        }
    }

    fn system_reset(&self) -> ! {
        self.record(CpuCall::SystemReset);
        panic::panic_any(SimulatedReset::Bare)
    }
}

#[derive(Debug, Default)]
pub struct SimSubsystem {
    active: Cell<bool>,
    waits: Cell<u32>,
}

impl SimSubsystem {
    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    pub fn waits(&self) -> u32 {
        self.waits.get()
    }
}

impl CooperativeSubsystem for SimSubsystem {
    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn wait_for_event(&self) {
        self.waits.set(self.waits.get() + 1);
    }

    fn system_reset(&self) -> ! {
        panic::panic_any(SimulatedReset::Cooperative)
    }
}

/// FPU interrupt line. Clears are logged into the CPU's call log so that
/// their order relative to waits can be checked.
pub struct SimFpu<'a> {
    cpu: &'a SimCpu,
    pending: Cell<bool>,
}

impl<'a> SimFpu<'a> {
    pub fn new(cpu: &'a SimCpu) -> Self {
        Self {
            cpu,
            pending: Cell::new(false),
        }
    }

    pub fn raise(&self) {
        self.pending.set(true);
    }
}

impl FpuInterrupt for SimFpu<'_> {
    fn is_pending(&self) -> bool {
        self.pending.get()
    }

    fn clear(&self) {
        self.cpu.record(CpuCall::ClearFpu);
        self.pending.set(false);
    }
}

#[derive(Debug, Default)]
pub struct SimRegister(Cell<u32>);

impl RetainedRegister for SimRegister {
    fn read(&self) -> u32 {
        self.0.get()
    }

    fn write(&self, value: u32) {
        self.0.set(value);
    }
}

#[derive(Debug, Default)]
pub struct SimWord(Cell<u32>);

impl RetainedWord for SimWord {
    fn get(&self) -> u32 {
        self.0.get()
    }

    fn set(&self, value: u32) {
        self.0.set(value);
    }
}

#[derive(Debug, Default)]
pub struct SimPowerMonitor(Cell<Option<PowerThresholds>>);

impl SimPowerMonitor {
    pub fn armed(&self) -> Option<PowerThresholds> {
        self.0.get()
    }
}

impl PowerMonitor for SimPowerMonitor {
    fn arm(&self, thresholds: &PowerThresholds) {
        self.0.set(Some(*thresholds));
    }
}

#[derive(Debug, Default)]
pub struct SimSafeMode(RefCell<Vec<ResetReason>>);

impl SimSafeMode {
    pub fn entries(&self) -> Vec<ResetReason> {
        self.0.borrow().clone()
    }
}

impl SafeModeHandler for SimSafeMode {
    fn enter_safe_mode(&self, reason: ResetReason) {
        self.0.borrow_mut().push(reason);
    }
}
