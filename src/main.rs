#![no_std]
#![no_main]

use core::{
    panic::PanicInfo,
    sync::atomic::{AtomicU32, Ordering},
};

use cortex_m::peripheral::SCB;
use cortex_m_rt::{ExceptionFrame, exception};
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use nrf_pac::interrupt;
use nrf_supervisor::{
    Port, PortParts, PowerThresholds, ResetReason, TickConfig,
    driver::{
        cpu::NoSubsystem,
        power::SafeModeHandler,
        socs::nrf::{
            NrfBoard,
            clock::{LfClockSource, NrfLfClock},
            cpu::{NrfCpu, NrfFpu},
            power::{Gpregret, NrfPowerMonitor},
            rtc::NrfRtc,
        },
    },
    util::sync::{init_cell::InitCell, volatile_cell::RetainedCell},
};

type Board = NrfBoard<fn(), PersistedSafeMode>;

static PORT: InitCell<Port<Board>> = InitCell::uninit();

/// Word handed to the application across warm resets.
#[unsafe(link_section = ".uninit.SAVED_WORD")]
static SAVED_WORD: RetainedCell = RetainedCell::uninit();

/// Safe mode reason of the previous boot, tagged to tell it apart from
/// power-on garbage.
#[unsafe(link_section = ".uninit.SAFE_MODE_REASON")]
static SAFE_MODE_REASON: RetainedCell = RetainedCell::uninit();

const SAFE_MODE_TAG: u32 = 0x5afe_0000;

static TICKS: AtomicU32 = AtomicU32::new(0);

struct PersistedSafeMode;

impl PersistedSafeMode {
    /// Returns the reason persisted before the last reset, if any, and
    /// forgets it.
    fn take_previous() -> Option<ResetReason> {
        let word = SAFE_MODE_REASON.get();
        SAFE_MODE_REASON.set(0);
        if word & 0xffff_ff00 != SAFE_MODE_TAG {
            return None;
        }
        ResetReason::try_from(word as u8).ok()
    }
}

impl SafeModeHandler for PersistedSafeMode {
    fn enter_safe_mode(&self, reason: ResetReason) {
        SAFE_MODE_REASON.set(SAFE_MODE_TAG | reason as u32);
    }
}

fn on_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

#[cortex_m_rt::entry]
fn main() -> ! {
    if let Some(reason) = PersistedSafeMode::take_previous() {
        #[cfg(feature = "defmt")]
        defmt::warn!("recovered from safe mode: {:?}", reason);
        #[cfg(not(feature = "defmt"))]
        let _ = reason;
    }

    let port = PORT.init(Port::new(PortParts {
        clock: NrfLfClock::new(LfClockSource::Xtal),
        // Safety: The port is the only user of RTC2.
        rtc: unsafe { NrfRtc::steal() },
        tick_hook: on_tick as fn(),
        cpu: NrfCpu,
        subsystem: NoSubsystem,
        fpu: NrfFpu,
        sentinel: Gpregret,
        saved_word: &SAVED_WORD,
        power_monitor: NrfPowerMonitor,
        safe_mode: PersistedSafeMode,
        tick_config: TickConfig::NRF_RTC,
        power_thresholds: PowerThresholds::default(),
    }));

    // A bootloader request that reaches us was not served: boot normally.
    port.init();
    port.tick().enable_periodic_signal();

    loop {
        port.delay_ticks(port.tick().ticks_per_second());
        #[cfg(feature = "defmt")]
        defmt::info!(
            "uptime {} ms, {} ticks",
            port.tick().now().as_millis(),
            TICKS.load(Ordering::Relaxed)
        );
    }
}

#[interrupt]
fn RTC2() {
    PORT.tick().on_interrupt();
}

#[interrupt]
fn POWER_CLOCK() {
    if NrfPowerMonitor.take_warning() {
        PORT.reset().on_power_warning();
    }
}

#[exception]
unsafe fn HardFault(_frame: &ExceptionFrame) -> ! {
    // Faults before the port exists have nowhere to record safe mode.
    if PORT.is_initialized() {
        PORT.reset().on_unrecoverable_fault()
    }
    SCB::sys_reset()
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("panic");
    SCB::sys_reset()
}
