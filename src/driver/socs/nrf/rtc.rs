//! RTC2 as the tick engine's counter.
//!
//! RTC0 is reserved for a BLE SoftDevice, RTC1 is commonly taken by an
//! application timer. Only compare channel 0 is used.

use cortex_m::peripheral::{NVIC, Peripherals as CorePeripherals};
use nrf_pac::{RTC2, interrupt};

use crate::driver::timer::{RtcCounter, RtcEvent, TickConfig};

use super::NrfExcPrio;

/// LFCLK frequency feeding the RTC prescaler.
const LFCLK_HZ: u32 = 32_768;

const WAKE_CHANNEL: usize = 0;

/// Interrupt priority of the RTC. Time keeping must preempt application
/// interrupts but not the radio.
pub const RTC_INT_PRIO: NrfExcPrio = match NrfExcPrio::from_nvic_level(6) {
    Ok(prio) => prio,
    Err(_) => panic!(),
};

/// The nRF RTC2 peripheral. A handle only: all state lives in the peripheral.
#[derive(Clone, Copy, Debug)]
pub struct NrfRtc {
    // Private field to block direct instantiation.
    private: (),
}

impl NrfRtc {
    /// Safety: Exactly one tick engine may drive RTC2.
    pub const unsafe fn steal() -> Self {
        Self { private: () }
    }
}

impl RtcCounter for NrfRtc {
    fn configure(&self, config: &TickConfig) {
        assert!(config.counter_bits() == 24);
        assert!(LFCLK_HZ % config.subtick_hz() == 0);
        let prescaler = LFCLK_HZ / config.subtick_hz() - 1;
        RTC2.prescaler().write(|w| w.set_prescaler(prescaler as u16));
    }

    fn clear(&self) {
        RTC2.tasks_stop().write_value(0x1);
        RTC2.tasks_clear().write_value(0x1);
        while RTC2.counter().read().counter() != 0 {}
    }

    fn start(&self) {
        RTC2.tasks_start().write_value(0x1);
    }

    fn clear_events(&self) {
        RTC2.events_ovrflw().write_value(0);
        RTC2.events_tick().write_value(0);
        RTC2.events_compare(WAKE_CHANNEL).write_value(0);
    }

    fn counter(&self) -> u32 {
        RTC2.counter().read().counter()
    }

    fn set_overflow_interrupt(&self, enabled: bool) {
        if enabled {
            RTC2.events_ovrflw().write_value(0);
            RTC2.intenset().write(|w| w.set_ovrflw(true));
        } else {
            RTC2.intenclr().write(|w| w.set_ovrflw(true));
        }
    }

    fn is_overflow_pending(&self) -> bool {
        RTC2.events_ovrflw().read() == 0x1
    }

    fn set_tick_interrupt(&self, enabled: bool) {
        if enabled {
            RTC2.events_tick().write_value(0);
            RTC2.intenset().write(|w| w.set_tick(true));
        } else {
            RTC2.intenclr().write(|w| w.set_tick(true));
        }
    }

    fn arm_compare(&self, value: u32) {
        RTC2.intenclr().write(|w| w.set_compare(WAKE_CHANNEL, true));
        RTC2.cc(WAKE_CHANNEL).write(|w| w.set_compare(value));
        RTC2.events_compare(WAKE_CHANNEL).write_value(0);
        RTC2.intenset().write(|w| w.set_compare(WAKE_CHANNEL, true));
    }

    fn disarm_compare(&self) {
        RTC2.intenclr().write(|w| w.set_compare(WAKE_CHANNEL, true));
        RTC2.events_compare(WAKE_CHANNEL).write_value(0);
        RTC2.cc(WAKE_CHANNEL).write(|w| w.set_compare(0));
    }

    fn armed_compare(&self) -> Option<u32> {
        RTC2.intenset()
            .read()
            .compare(WAKE_CHANNEL)
            .then(|| RTC2.cc(WAKE_CHANNEL).read().compare())
    }

    fn take_event(&self) -> Option<RtcEvent> {
        let inten = RTC2.intenset().read();
        if inten.ovrflw() && RTC2.events_ovrflw().read() == 0x1 {
            RTC2.events_ovrflw().write_value(0);
            Some(RtcEvent::Overflow)
        } else if inten.tick() && RTC2.events_tick().read() == 0x1 {
            RTC2.events_tick().write_value(0);
            Some(RtcEvent::Tick)
        } else if inten.compare(WAKE_CHANNEL)
            && RTC2.events_compare(WAKE_CHANNEL).read() == 0x1
        {
            RTC2.events_compare(WAKE_CHANNEL).write_value(0);
            Some(RtcEvent::Compare)
        } else {
            None
        }
    }

    fn unmask_interrupt(&self) {
        // Safety: We don't rely on priority masking for synchronization.
        let mut nvic = unsafe { CorePeripherals::steal() }.NVIC;
        unsafe { nvic.set_priority(interrupt::RTC2, RTC_INT_PRIO.to_arm_nvic_repr()) };

        NVIC::unpend(interrupt::RTC2);
        // Safety: We don't rely on interrupt masking for synchronization.
        unsafe { NVIC::unmask(interrupt::RTC2) };
    }
}
