pub mod clock;
pub mod cpu;
pub mod power;
pub mod rtc;

use core::marker::PhantomData;

use crate::{
    driver::{cpu::NoSubsystem, power::SafeModeHandler, timer::TickHook},
    port::PortConfig,
    util::sync::{
        priority::{ExecutionPriority, PB3},
        volatile_cell::RetainedCell,
    },
};

use self::{
    clock::NrfLfClock,
    cpu::{NrfCpu, NrfFpu},
    power::{Gpregret, NrfPowerMonitor},
    rtc::NrfRtc,
};

pub type NrfPrioBits = PB3;
pub type NrfExcPrio = ExecutionPriority<NrfPrioBits>;

/// nRF52 board without a radio stack. `Hook` receives the periodic tick,
/// `SafeMode` persists safe mode reasons.
pub struct NrfBoard<Hook, SafeMode> {
    _marker: PhantomData<(Hook, SafeMode)>,
}

impl<Hook, SafeMode> PortConfig for NrfBoard<Hook, SafeMode>
where
    Hook: TickHook,
    SafeMode: SafeModeHandler,
{
    type Clock = NrfLfClock;
    type Rtc = NrfRtc;
    type TickHook = Hook;
    type Cpu = NrfCpu;
    type Subsystem = NoSubsystem;
    type Fpu = NrfFpu;
    type Sentinel = Gpregret;
    type SavedWord = &'static RetainedCell;
    type PowerMonitor = NrfPowerMonitor;
    type SafeMode = SafeMode;
}
