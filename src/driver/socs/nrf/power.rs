use cortex_m::peripheral::NVIC;
use nrf_pac::{
    POWER, interrupt,
    power::vals::{Threshold, Thresholdvddh},
};

use crate::driver::{
    handshake::RetainedRegister,
    power::{PowerMonitor, PowerThresholds},
};

/// The power failure comparator. Warnings raise `POWER_CLOCK`, whose
/// handler must call [`crate::driver::power::ResetController::on_power_warning()`].
#[derive(Clone, Copy, Debug)]
pub struct NrfPowerMonitor;

impl NrfPowerMonitor {
    /// Acknowledges the warning event. Returns `true` if it was set.
    pub fn take_warning(&self) -> bool {
        let pending = POWER.events_pofwarn().read() == 0x1;
        if pending {
            POWER.events_pofwarn().write_value(0);
        }
        pending
    }
}

impl PowerMonitor for NrfPowerMonitor {
    fn arm(&self, thresholds: &PowerThresholds) {
        POWER.pofcon().write(|w| {
            w.set_pof(true);
            w.set_threshold(Threshold::from_bits(thresholds.vdd as u8));
            if let Some(vddh) = thresholds.vddh {
                w.set_thresholdvddh(Thresholdvddh::from_bits(vddh as u8));
            }
        });
        POWER.events_pofwarn().write_value(0);
        POWER.intenset().write(|w| w.set_pofwarn(true));

        NVIC::unpend(interrupt::POWER_CLOCK);
        // Safety: We don't rely on interrupt masking for synchronization.
        unsafe { NVIC::unmask(interrupt::POWER_CLOCK) };
    }
}

/// GPREGRET, read by the bootloader after reset.
#[derive(Clone, Copy, Debug)]
pub struct Gpregret;

impl RetainedRegister for Gpregret {
    fn read(&self) -> u32 {
        POWER.gpregret().read().gpregret() as u32
    }

    fn write(&self, value: u32) {
        // The register is 8 bits wide.
        debug_assert!(value <= 0xff);
        POWER.gpregret().write(|w| w.set_gpregret(value as u8));
    }
}
