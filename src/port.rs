//! Board support core: composes the clock, tick engine, sleep controller and
//! reset controller of one board.

use crate::driver::{
    clock::{LfClock, ensure_oscillator_running},
    cpu::{CooperativeSubsystem, Cpu, Processor},
    handshake::{BootAction, BootHandshake, RetainedRegister, RetainedWord},
    power::{PowerMonitor, PowerThresholds, ResetController, SafeModeHandler},
    sleep::{FpuInterrupt, SleepController},
    tick::TickEngine,
    timer::{RtcCounter, TickConfig, TickHook},
};

/// The hardware a board is built from.
pub trait PortConfig {
    type Clock: LfClock;
    type Rtc: RtcCounter;
    type TickHook: TickHook;

    /// Shared by the sleep and reset controllers.
    type Cpu: Cpu + Copy;

    /// Shared by the sleep and reset controllers.
    type Subsystem: CooperativeSubsystem + Copy;

    type Fpu: FpuInterrupt;
    type Sentinel: RetainedRegister;
    type SavedWord: RetainedWord;
    type PowerMonitor: PowerMonitor;
    type SafeMode: SafeModeHandler;
}

pub type PortTickEngine<Config> =
    TickEngine<<Config as PortConfig>::Rtc, <Config as PortConfig>::TickHook>;

pub type PortSleepController<Config> = SleepController<
    <Config as PortConfig>::Cpu,
    <Config as PortConfig>::Subsystem,
    <Config as PortConfig>::Fpu,
>;

pub type PortResetController<Config> = ResetController<
    <Config as PortConfig>::Cpu,
    <Config as PortConfig>::Subsystem,
    <Config as PortConfig>::Sentinel,
    <Config as PortConfig>::SavedWord,
    <Config as PortConfig>::PowerMonitor,
    <Config as PortConfig>::SafeMode,
>;

/// Peripheral instances and settings consumed by [`Port::new()`].
pub struct PortParts<Config: PortConfig> {
    pub clock: Config::Clock,
    pub rtc: Config::Rtc,
    pub tick_hook: Config::TickHook,
    pub cpu: Config::Cpu,
    pub subsystem: Config::Subsystem,
    pub fpu: Config::Fpu,
    pub sentinel: Config::Sentinel,
    pub saved_word: Config::SavedWord,
    pub power_monitor: Config::PowerMonitor,
    pub safe_mode: Config::SafeMode,
    pub tick_config: TickConfig,
    pub power_thresholds: PowerThresholds,
}

/// Exactly one port exists per board. It lives in a static so that the
/// interrupt vectors can reach it.
pub struct Port<Config: PortConfig> {
    clock: Config::Clock,
    tick: PortTickEngine<Config>,
    sleep: PortSleepController<Config>,
    reset: PortResetController<Config>,
    power_thresholds: PowerThresholds,
}

impl<Config: PortConfig> Port<Config> {
    pub fn new(parts: PortParts<Config>) -> Self {
        let processor = Processor::new(parts.cpu, parts.subsystem);
        Self {
            clock: parts.clock,
            tick: TickEngine::new(parts.rtc, parts.tick_hook, parts.tick_config),
            sleep: SleepController::new(processor, parts.fpu),
            reset: ResetController::new(
                processor,
                BootHandshake::new(parts.sentinel, parts.saved_word),
                parts.power_monitor,
                parts.safe_mode,
            ),
            power_thresholds: parts.power_thresholds,
        }
    }

    /// Brings the board up: low-frequency clock, brownout warning, tick
    /// engine.
    ///
    /// The boot sentinel is consulted (and consumed) first. A pending
    /// bootloader request at this point was not served by the bootloader and
    /// is returned for the caller to act on.
    pub fn init(&self) -> BootAction {
        let boot_action = self.reset.handshake().take_boot_action();
        if boot_action == BootAction::EnterBootloader {
            warn!("bootloader request was not served");
        }

        let lf_clock = ensure_oscillator_running(&self.clock);
        self.reset.configure_power_monitor(&self.power_thresholds);
        self.tick.start(lf_clock);
        boot_action
    }

    pub fn tick(&self) -> &PortTickEngine<Config> {
        &self.tick
    }

    pub fn sleep(&self) -> &PortSleepController<Config> {
        &self.sleep
    }

    pub fn reset(&self) -> &PortResetController<Config> {
        &self.reset
    }

    /// Sleeps until at least `ticks` whole ticks have passed.
    ///
    /// Other interrupts may wake the CPU early, the wake target is re-armed
    /// until the deadline is reached.
    pub fn delay_ticks(&self, ticks: u32) {
        let deadline = self.tick.now().ticks + ticks as u64;
        loop {
            let now = self.tick.now().ticks;
            if now >= deadline {
                break;
            }
            let remaining = (deadline - now).min(u32::MAX as u64) as u32;
            self.tick.schedule_wake(remaining);
            self.sleep.sleep_until_interrupt();
        }
        self.tick.cancel_wake();
    }
}
