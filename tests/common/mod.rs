//! A simulated nRF board built on the public driver traits.
//!
//! Peripherals are leaked so that the port can be `'static` like on
//! hardware. Retained state ([`Retained`]) is kept separately and outlives
//! simulated resets, everything else is rebuilt per boot.

#![allow(dead_code)]

use std::{
    cell::Cell,
    panic::{self, AssertUnwindSafe},
};

use nrf_supervisor::{
    Port, PortConfig, PortParts, PowerThresholds, ResetReason, TickConfig,
    driver::{
        clock::LfClock,
        cpu::{CooperativeSubsystem, Cpu},
        handshake::{RetainedRegister, RetainedWord},
        power::{PowerMonitor, SafeModeHandler},
        sleep::FpuInterrupt,
        timer::{RtcCounter, RtcEvent, TickHook},
    },
};

pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// Unwind payload of a simulated CPU reset.
#[derive(Debug, PartialEq, Eq)]
pub struct Reset;

/// Runs `f`, which must end in a reset.
pub fn expect_reset(f: impl FnOnce()) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("expected a reset"),
        Err(payload) => {
            if payload.downcast_ref::<Reset>().is_none() {
                panic::resume_unwind(payload)
            }
        }
    }
}

#[derive(Default)]
pub struct Rtc {
    counter: Cell<u32>,
    overflow_enabled: Cell<bool>,
    overflow_pending: Cell<bool>,
    tick_enabled: Cell<bool>,
    tick_pending: Cell<bool>,
    compare: Cell<Option<u32>>,
    compare_pending: Cell<bool>,
    pub overflow_events: Cell<u32>,
    pub compare_events: Cell<u32>,
}

impl Rtc {
    const MASK: u32 = 0xff_ffff;

    pub fn counter_value(&self) -> u32 {
        self.counter.get()
    }

    /// Advances the counter by `n` subticks without running the interrupt.
    /// Events raised on the way stay pending.
    pub fn advance(&self, n: u32) {
        if n == 0 {
            return;
        }
        let start = self.counter.get();
        let end = start as u64 + n as u64;
        self.counter.set((end & Self::MASK as u64) as u32);

        if end > Self::MASK as u64 && self.overflow_enabled.get() {
            self.overflow_pending.set(true);
        }
        if self.tick_enabled.get() {
            self.tick_pending.set(true);
        }
        if let Some(target) = self.compare.get() {
            let distance = match target.wrapping_sub(start) & Self::MASK {
                0 => Self::MASK as u64 + 1,
                d => d as u64,
            };
            if distance <= n as u64 {
                self.compare_pending.set(true);
            }
        }
    }
}

impl RtcCounter for Rtc {
    fn configure(&self, config: &TickConfig) {
        assert_eq!(config.counter_bits(), 24);
    }

    fn clear(&self) {
        self.counter.set(0);
    }

    fn start(&self) {}

    fn clear_events(&self) {
        self.overflow_pending.set(false);
        self.tick_pending.set(false);
        self.compare_pending.set(false);
    }

    fn counter(&self) -> u32 {
        self.counter.get()
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
            self.overflow_events.set(self.overflow_events.get() + 1);
            Some(RtcEvent::Overflow)
        } else if self.tick_enabled.get() && self.tick_pending.replace(false) {
            Some(RtcEvent::Tick)
        } else if self.compare_pending.replace(false) {
            self.compare_events.set(self.compare_events.get() + 1);
            Some(RtcEvent::Compare)
        } else {
            None
        }
    }

    fn unmask_interrupt(&self) {}
}

pub struct Clock;

impl LfClock for Clock {
    fn is_running(&self) -> bool {
        true
    }

    fn start(&self) {}
}

#[derive(Default)]
pub struct Ticks(pub Cell<u32>);

impl TickHook for Ticks {
    fn on_tick(&self) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Default)]
pub struct CpuSim {
    pub waits: Cell<u32>,
    pub resets: Cell<u32>,
}

impl Cpu for CpuSim {
    fn wait_for_interrupt(&self) {
        self.waits.set(self.waits.get() + 1);
    }

    fn system_reset(&self) -> ! {
        self.resets.set(self.resets.get() + 1);
        panic::panic_any(Reset)
    }
}

pub struct NoRadio;

impl CooperativeSubsystem for NoRadio {
    fn is_active(&self) -> bool {
        false
    }

    fn wait_for_event(&self) {}

    fn system_reset(&self) -> ! {
        unreachable!()
    }
}

pub struct Fpu;

impl FpuInterrupt for Fpu {
    fn is_pending(&self) -> bool {
        false
    }

    fn clear(&self) {}
}

/// Memory that survives warm resets.
#[derive(Default)]
pub struct Retained {
    pub sentinel: Register,
    pub saved_word: Word,
    pub safe_mode: SafeModeLog,
}

#[derive(Default)]
pub struct Register(pub Cell<u32>);

impl RetainedRegister for Register {
    fn read(&self) -> u32 {
        self.0.get()
    }

    fn write(&self, value: u32) {
        self.0.set(value);
    }
}

#[derive(Default)]
pub struct Word(pub Cell<u32>);

impl RetainedWord for Word {
    fn get(&self) -> u32 {
        self.0.get()
    }

    fn set(&self, value: u32) {
        self.0.set(value);
    }
}

#[derive(Default)]
pub struct SafeModeLog {
    pub reason: Cell<Option<ResetReason>>,
    pub entries: Cell<u32>,
}

impl SafeModeHandler for SafeModeLog {
    fn enter_safe_mode(&self, reason: ResetReason) {
        self.reason.set(Some(reason));
        self.entries.set(self.entries.get() + 1);
    }
}

pub struct Monitor;

impl PowerMonitor for Monitor {
    fn arm(&self, _thresholds: &PowerThresholds) {}
}

pub struct Board;

impl PortConfig for Board {
    type Clock = Clock;
    type Rtc = &'static Rtc;
    type TickHook = &'static Ticks;
    type Cpu = &'static CpuSim;
    type Subsystem = &'static NoRadio;
    type Fpu = Fpu;
    type Sentinel = &'static Register;
    type SavedWord = &'static Word;
    type PowerMonitor = Monitor;
    type SafeMode = &'static SafeModeLog;
}

pub struct Boot {
    pub port: &'static Port<Board>,
    pub rtc: &'static Rtc,
    pub ticks: &'static Ticks,
    pub cpu: &'static CpuSim,
}

/// Boots a fresh board over `retained`. The port is not initialized yet.
pub fn boot(retained: &'static Retained) -> Boot {
    let rtc = leak(Rtc::default());
    let ticks = leak(Ticks::default());
    let cpu = leak(CpuSim::default());
    let port = leak(Port::new(PortParts {
        clock: Clock,
        rtc,
        tick_hook: ticks,
        cpu,
        subsystem: leak(NoRadio),
        fpu: Fpu,
        sentinel: &retained.sentinel,
        saved_word: &retained.saved_word,
        power_monitor: Monitor,
        safe_mode: &retained.safe_mode,
        tick_config: TickConfig::NRF_RTC,
        power_thresholds: PowerThresholds::default(),
    }));
    Boot {
        port,
        rtc,
        ticks,
        cpu,
    }
}
