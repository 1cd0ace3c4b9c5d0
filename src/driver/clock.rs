//! Low-frequency clock bring-up.
//!
//! The RTC behind the tick engine only counts while the low-frequency clock
//! runs. [`ensure_oscillator_running()`] returns a [`LfClockRunning`] proof
//! that [`crate::driver::tick::TickEngine::start()`] requires, so the boot
//! order cannot be violated.

/// Low-frequency oscillator control as exposed by the clock peripheral.
pub trait LfClock {
    /// Returns `true` if the oscillator is already running, e.g. because it
    /// was started before a warm reset or by a debugger.
    fn is_running(&self) -> bool;

    /// Triggers the start task. Returns once the oscillator reports as
    /// started.
    fn start(&self);
}

impl<T: LfClock + ?Sized> LfClock for &T {
    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn start(&self) {
        (**self).start()
    }
}

/// Zero-sized proof that the low-frequency clock has been started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LfClockRunning {
    // Private field to block direct instantiation.
    private: (),
}

/// Idempotent: the start task is only triggered if the oscillator is not yet
/// running.
pub fn ensure_oscillator_running(clock: &impl LfClock) -> LfClockRunning {
    if clock.is_running() {
        trace!("lfclk already running");
    } else {
        clock.start();
        debug!("lfclk started");
    }
    LfClockRunning { private: () }
}
