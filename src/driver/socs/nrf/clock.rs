use nrf_pac::{CLOCK, clock::vals::Lfclksrc};

use crate::driver::clock::LfClock;

/// Source of the 32.768 kHz low-frequency clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LfClockSource {
    /// Internal RC oscillator.
    Rc,
    /// External 32.768 kHz crystal, or an external clock signal with the
    /// `ext-lf-clk` feature.
    Xtal,
    /// Synthesized from the HF clock.
    Synth,
}

/// The nRF CLOCK peripheral's LF oscillator.
#[derive(Clone, Copy, Debug)]
pub struct NrfLfClock {
    source: LfClockSource,
}

impl NrfLfClock {
    pub const fn new(source: LfClockSource) -> Self {
        Self { source }
    }

    fn select_source(&self) {
        match self.source {
            LfClockSource::Rc => CLOCK.lfclksrc().write(|w| {
                w.set_src(Lfclksrc::RC);
                w.set_external(false);
                w.set_bypass(false);
            }),
            LfClockSource::Synth => CLOCK.lfclksrc().write(|w| {
                w.set_src(Lfclksrc::SYNTH);
                w.set_external(false);
                w.set_bypass(false);
            }),
            #[cfg(not(feature = "ext-lf-clk"))]
            LfClockSource::Xtal => CLOCK.lfclksrc().write(|w| {
                w.set_src(Lfclksrc::XTAL);
                w.set_external(false);
                w.set_bypass(false);
            }),
            #[cfg(feature = "ext-lf-clk")]
            LfClockSource::Xtal => CLOCK.lfclksrc().write(|w| {
                w.set_src(Lfclksrc::XTAL);
                w.set_external(true);
                w.set_bypass(true);
            }),
        }
    }
}

impl LfClock for NrfLfClock {
    fn is_running(&self) -> bool {
        // The LF clock keeps running across warm resets and while debugging.
        CLOCK.lfclkstat().read().state()
    }

    fn start(&self) {
        self.select_source();
        CLOCK.events_lfclkstarted().write_value(0);
        CLOCK.tasks_lfclkstart().write_value(0x1);
        // When connected to an external clock source, this loop will block
        // indefinitely until the external clock has been started.
        while CLOCK.events_lfclkstarted().read() != 0x1 {}
    }
}
