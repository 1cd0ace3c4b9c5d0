//! Low-power wait.
//!
//! The FPU raises its interrupt on floating point exceptions. That interrupt
//! is never enabled, but its pending bit alone keeps WFI from entering sleep
//! (nRF52 erratum 87). The pending bit is cleared before every wait.

use crate::driver::cpu::{CooperativeSubsystem, Cpu, CpuCapability, Processor};

/// The FPU exception interrupt line.
pub trait FpuInterrupt {
    fn is_pending(&self) -> bool;

    /// Clears the cumulative exception flags and unpends the interrupt.
    fn clear(&self);
}

impl<T: FpuInterrupt + ?Sized> FpuInterrupt for &T {
    fn is_pending(&self) -> bool {
        (**self).is_pending()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

pub struct SleepController<C: Cpu, S: CooperativeSubsystem, F: FpuInterrupt> {
    processor: Processor<C, S>,
    fpu: F,
}

impl<C: Cpu, S: CooperativeSubsystem, F: FpuInterrupt> SleepController<C, S, F> {
    pub const fn new(processor: Processor<C, S>, fpu: F) -> Self {
        Self { processor, fpu }
    }

    /// Suspends the CPU until any interrupt is pending.
    ///
    /// Returns immediately if an interrupt is already pending. Callers must
    /// re-check their wake condition after return.
    pub fn sleep_until_interrupt(&self) {
        if self.fpu.is_pending() {
            self.fpu.clear();
        }
        self.processor.capability().wait_for_interrupt();
    }
}
