//! Brownout detection, fault handling and deliberate resets.
//!
//! Every path through the [`ResetController`] ends in a CPU reset. Fatal
//! conditions first move the controller into safe mode and hand the reason
//! to the [`SafeModeHandler`], which persists it for the next boot.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::driver::{
    cpu::{CooperativeSubsystem, Cpu, CpuCapability, Processor},
    handshake::{BootHandshake, RetainedRegister, RetainedWord},
};

/// Why the system is about to restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResetReason {
    /// The supply voltage dropped below the warning threshold.
    Brownout = 1,
    /// A hard fault trapped.
    UnrecoverableFault = 2,
    BootloaderRequest = 3,
    PlainReset = 4,
}

impl TryFrom<u8> for ResetReason {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Brownout),
            2 => Ok(Self::UnrecoverableFault),
            3 => Ok(Self::BootloaderRequest),
            4 => Ok(Self::PlainReset),
            other => Err(other),
        }
    }
}

/// Power failure warning threshold of the main supply (VDD).
///
/// Discriminants are the nRF52 POFCON.THRESHOLD encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PofThreshold {
    V17 = 4,
    V18,
    V19,
    V20,
    V21,
    V22,
    V23,
    V24,
    V25,
    V26,
    V27,
    V28,
}

impl PofThreshold {
    pub const fn millivolts(self) -> u16 {
        1700 + (self as u16 - Self::V17 as u16) * 100
    }
}

/// Power failure warning threshold of the high voltage supply (VDDH).
///
/// Discriminants are the nRF52840 POFCON.THRESHOLDVDDH encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VddhThreshold {
    V27 = 0,
    V28,
    V29,
    V30,
    V31,
    V32,
    V33,
    V34,
    V35,
    V36,
    V37,
    V38,
    V39,
    V40,
    V41,
    V42,
}

impl VddhThreshold {
    pub const fn millivolts(self) -> u16 {
        2700 + self as u16 * 100
    }
}

const _: () = {
    assert!(PofThreshold::V28 as u8 == 15);
    assert!(PofThreshold::V27.millivolts() == 2700);
    assert!(VddhThreshold::V42 as u8 == 15);
    assert!(VddhThreshold::V27.millivolts() == 2700);
};

/// Brownout warning levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerThresholds {
    pub vdd: PofThreshold,
    /// `None` disables the warning on the high voltage rail.
    pub vddh: Option<VddhThreshold>,
}

impl Default for PowerThresholds {
    fn default() -> Self {
        Self {
            vdd: PofThreshold::V27,
            vddh: Some(VddhThreshold::V27),
        }
    }
}

/// The power failure comparator.
pub trait PowerMonitor {
    /// Enables the comparator and its warning interrupt. The interrupt must
    /// end up in [`ResetController::on_power_warning()`].
    fn arm(&self, thresholds: &PowerThresholds);
}

impl<T: PowerMonitor + ?Sized> PowerMonitor for &T {
    fn arm(&self, thresholds: &PowerThresholds) {
        (**self).arm(thresholds)
    }
}

/// Persists the safe mode reason for the next boot.
///
/// Called at most once per boot, possibly from the fault trap: implementations
/// must neither block nor allocate.
pub trait SafeModeHandler {
    fn enter_safe_mode(&self, reason: ResetReason);
}

impl<T: SafeModeHandler + ?Sized> SafeModeHandler for &T {
    fn enter_safe_mode(&self, reason: ResetReason) {
        (**self).enter_safe_mode(reason)
    }
}

const RUNNING: u8 = 0;

pub struct ResetController<C, S, R, W, P, M>
where
    C: Cpu,
    S: CooperativeSubsystem,
    R: RetainedRegister,
    W: RetainedWord,
    P: PowerMonitor,
    M: SafeModeHandler,
{
    processor: Processor<C, S>,
    handshake: BootHandshake<R, W>,
    monitor: P,
    safe_mode: M,

    /// `RUNNING` or the `ResetReason` of the safe mode entry.
    state: AtomicU8,
}

impl<C, S, R, W, P, M> ResetController<C, S, R, W, P, M>
where
    C: Cpu,
    S: CooperativeSubsystem,
    R: RetainedRegister,
    W: RetainedWord,
    P: PowerMonitor,
    M: SafeModeHandler,
{
    pub const fn new(
        processor: Processor<C, S>,
        handshake: BootHandshake<R, W>,
        monitor: P,
        safe_mode: M,
    ) -> Self {
        Self {
            processor,
            handshake,
            monitor,
            safe_mode,
            state: AtomicU8::new(RUNNING),
        }
    }

    pub fn handshake(&self) -> &BootHandshake<R, W> {
        &self.handshake
    }

    /// Arms the brownout warning.
    pub fn configure_power_monitor(&self, thresholds: &PowerThresholds) {
        self.monitor.arm(thresholds);
        match thresholds.vddh {
            Some(vddh) => info!(
                "power monitor armed: vdd {} mV, vddh {} mV",
                thresholds.vdd.millivolts(),
                vddh.millivolts()
            ),
            None => info!("power monitor armed: vdd {} mV", thresholds.vdd.millivolts()),
        }
    }

    /// `None` while running normally.
    pub fn safe_mode(&self) -> Option<ResetReason> {
        ResetReason::try_from(self.state.load(Ordering::Acquire)).ok()
    }

    /// Handler of the power failure warning interrupt.
    pub fn on_power_warning(&self) -> ! {
        if self.enter_safe_mode(ResetReason::Brownout) {
            error!("brownout, entering safe mode");
        }
        self.processor.capability().reset()
    }

    /// Handler of the hard fault trap.
    ///
    /// Resets through the bare CPU: a cooperative subsystem cannot be called
    /// from the fault trap.
    pub fn on_unrecoverable_fault(&self) -> ! {
        self.enter_safe_mode(ResetReason::UnrecoverableFault);
        self.processor.bare().reset()
    }

    /// Restarts into the bootloader.
    pub fn request_bootloader_reset(&self) -> ! {
        self.handshake.request_bootloader();
        info!("resetting into bootloader");
        self.processor.capability().reset()
    }

    pub fn request_plain_reset(&self) -> ! {
        info!("resetting");
        self.processor.capability().reset()
    }

    pub fn get_saved_word(&self) -> u32 {
        self.handshake.saved_word()
    }

    pub fn set_saved_word(&self, value: u32) {
        self.handshake.set_saved_word(value);
    }

    /// Moves to safe mode. Returns `false` if already there: the first reason
    /// wins and the handler is not called again.
    fn enter_safe_mode(&self, reason: ResetReason) -> bool {
        let entered = self
            .state
            .compare_exchange(RUNNING, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if entered {
            self.safe_mode.enter_safe_mode(reason);
        }
        entered
    }
}
