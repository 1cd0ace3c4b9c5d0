use cortex_m::{
    asm::wfi,
    peripheral::{NVIC, SCB},
    register::fpscr::{self, Fpscr},
};
use nrf_pac::interrupt;

use crate::driver::{cpu::Cpu, sleep::FpuInterrupt};

/// Cumulative FPU exception flags (IOC, DZC, OFC, UFC, IXC, IDC).
const FPSCR_EXCEPTION_FLAGS: u32 = 0x9f;

#[derive(Clone, Copy, Debug)]
pub struct NrfCpu;

impl Cpu for NrfCpu {
    fn wait_for_interrupt(&self) {
        wfi();
    }

    fn system_reset(&self) -> ! {
        SCB::sys_reset()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NrfFpu;

impl FpuInterrupt for NrfFpu {
    fn is_pending(&self) -> bool {
        NVIC::is_pending(interrupt::FPU)
    }

    fn clear(&self) {
        let flags = fpscr::read().bits();
        // Safety: Only the sticky exception flags are cleared.
        unsafe { fpscr::write(Fpscr::from_bits(flags & !FPSCR_EXCEPTION_FLAGS)) };
        // The write must complete before the interrupt is unpended.
        let _ = fpscr::read();
        NVIC::unpend(interrupt::FPU);
    }
}
