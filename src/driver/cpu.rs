//! CPU wait/reset capability.
//!
//! A radio stack that owns interrupt priorities and masking (e.g. a BLE
//! SoftDevice) must be asked to wait or reset on our behalf while it is
//! enabled. Issuing the raw instructions behind its back desynchronizes it.
//! [`Processor::capability()`] picks the right implementation at runtime.

/// Raw CPU instructions.
pub trait Cpu {
    /// Waits for interrupt (WFI). Returns once any enabled interrupt is
    /// pending.
    fn wait_for_interrupt(&self);

    /// Requests a full system reset.
    fn system_reset(&self) -> !;
}

impl<T: Cpu + ?Sized> Cpu for &T {
    fn wait_for_interrupt(&self) {
        (**self).wait_for_interrupt()
    }

    fn system_reset(&self) -> ! {
        (**self).system_reset()
    }
}

/// A subsystem that, while active, owns waiting and resetting.
pub trait CooperativeSubsystem {
    fn is_active(&self) -> bool;

    /// The subsystem's cooperative wait primitive.
    fn wait_for_event(&self);

    /// The subsystem's reset primitive.
    fn system_reset(&self) -> !;
}

impl<T: CooperativeSubsystem + ?Sized> CooperativeSubsystem for &T {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn wait_for_event(&self) {
        (**self).wait_for_event()
    }

    fn system_reset(&self) -> ! {
        (**self).system_reset()
    }
}

/// For boards without a cooperative subsystem. Never active, so the bare CPU
/// is always selected.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSubsystem;

impl CooperativeSubsystem for NoSubsystem {
    fn is_active(&self) -> bool {
        false
    }

    fn wait_for_event(&self) {}

    fn system_reset(&self) -> ! {
        // Nothing to hand the reset to. Spin until the watchdog or a debugger
        // takes over.
        loop {
            core::hint::spin_loop();
        }
    }
}

/// What callers may do with the CPU: wait and reset.
pub trait CpuCapability {
    fn wait_for_interrupt(&self);
    fn reset(&self) -> !;
}

/// Issues the raw CPU instructions.
pub struct BareCpu<C: Cpu>(pub C);

impl<C: Cpu> CpuCapability for BareCpu<C> {
    fn wait_for_interrupt(&self) {
        self.0.wait_for_interrupt()
    }

    fn reset(&self) -> ! {
        self.0.system_reset()
    }
}

/// Delegates to the cooperative subsystem.
pub struct CooperativeCpu<S: CooperativeSubsystem>(pub S);

impl<S: CooperativeSubsystem> CpuCapability for CooperativeCpu<S> {
    fn wait_for_interrupt(&self) {
        self.0.wait_for_event()
    }

    fn reset(&self) -> ! {
        self.0.system_reset()
    }
}

/// The capability selected for the current moment.
pub enum Capability<'a, C: Cpu, S: CooperativeSubsystem> {
    Bare(BareCpu<&'a C>),
    Cooperative(CooperativeCpu<&'a S>),
}

impl<C: Cpu, S: CooperativeSubsystem> CpuCapability for Capability<'_, C, S> {
    fn wait_for_interrupt(&self) {
        match self {
            Capability::Bare(cpu) => cpu.wait_for_interrupt(),
            Capability::Cooperative(cpu) => cpu.wait_for_interrupt(),
        }
    }

    fn reset(&self) -> ! {
        match self {
            Capability::Bare(cpu) => cpu.reset(),
            Capability::Cooperative(cpu) => cpu.reset(),
        }
    }
}

/// The CPU plus the optional subsystem that may take it over.
#[derive(Clone, Copy, Debug)]
pub struct Processor<C: Cpu, S: CooperativeSubsystem> {
    cpu: C,
    subsystem: S,
}

impl<C: Cpu, S: CooperativeSubsystem> Processor<C, S> {
    pub const fn new(cpu: C, subsystem: S) -> Self {
        Self { cpu, subsystem }
    }

    /// Selects the cooperative implementation while the subsystem is active
    /// and the bare CPU otherwise.
    pub fn capability(&self) -> Capability<'_, C, S> {
        if self.subsystem.is_active() {
            Capability::Cooperative(CooperativeCpu(&self.subsystem))
        } else {
            Capability::Bare(BareCpu(&self.cpu))
        }
    }

    /// The raw CPU, regardless of the subsystem's state.
    pub fn bare(&self) -> BareCpu<&C> {
        BareCpu(&self.cpu)
    }
}
