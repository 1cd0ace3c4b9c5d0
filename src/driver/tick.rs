//! The tick engine extends a narrow wrap-around RTC counter to a monotonic
//! 64 bit tick count, forwards whole ticks to the scheduler and manages the
//! single one-shot wake target.
//!
//! Exactly one engine exists per board. It is constructed once at startup and
//! passed by reference to everything that needs time or wake scheduling. The
//! RTC interrupt vector reaches it through the board's init cell and calls
//! [`TickEngine::on_interrupt()`].
//!
//! # Overflow extension
//!
//! The raw counter is `counter_bits` wide. Every wrap advances the software
//! extension by `2^(counter_bits - subtick_bits)` ticks. The extension is
//! stored as a wrap count in a 32 bit atomic so that interrupt and thread
//! context share it without critical sections, even on cores without 64 bit
//! atomics. A 32 bit wrap count of a 24 bit counter at 32.768 kHz covers
//! ~70000 years of uptime.
//!
//! # Reading the time
//!
//! [`TickEngine::now()`] must not combine a wrap count from before an overflow
//! with a counter value from after it. Two things can go wrong:
//!
//! - The overflow interrupt runs between reading the wrap count and reading
//!   the counter. This is detected by re-reading the wrap count and retrying.
//! - The counter wrapped but the interrupt has not run yet (e.g. because the
//!   reader masks interrupts or runs at the RTC priority). This is detected by
//!   the pending overflow event: if it is set and the counter lies in the
//!   lower half of its range, the wrap is accounted for in place.
//!
//! The second check assumes that the interrupt is not held off for more than
//! half a counter period (~4 minutes with the default geometry).
//!
//! Neither check covers a reader that preempts the overflow handler itself
//! between acknowledging the event and storing the new wrap count. Such a
//! reader sees one period too little. Readers running strictly above the RTC
//! priority must therefore not rely on `now()`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering, compiler_fence};

use crate::driver::{
    clock::LfClockRunning,
    timer::{MonotonicTime, RtcCounter, RtcEvent, TickConfig, TickHook},
};

pub struct TickEngine<R: RtcCounter, H: TickHook> {
    rtc: R,
    hook: H,
    config: TickConfig,

    /// Number of counter wraps since the last start.
    ///
    /// Written from the RTC interrupt only (and from `start()` before the
    /// interrupt is unmasked).
    overflows: AtomicU32,

    /// Whether whole ticks are forwarded to the tick hook.
    periodic_signal: AtomicBool,
}

impl<R: RtcCounter, H: TickHook> TickEngine<R, H> {
    pub const fn new(rtc: R, hook: H, config: TickConfig) -> Self {
        Self {
            rtc,
            hook,
            config,
            overflows: AtomicU32::new(0),
            periodic_signal: AtomicBool::new(false),
        }
    }

    /// Clears and starts the counter and enables overflow tracking.
    ///
    /// Call once at boot. Calling it again restarts time from zero.
    pub fn start(&self, _lf_clock: LfClockRunning) {
        self.rtc.set_overflow_interrupt(false);
        self.rtc.set_tick_interrupt(false);
        self.rtc.disarm_compare();
        self.periodic_signal.store(false, Ordering::Relaxed);
        self.overflows.store(0, Ordering::Relaxed);
        compiler_fence(Ordering::Release);

        self.rtc.clear();
        // A wrap from before the restart must not count against the new time.
        self.rtc.clear_events();
        self.rtc.configure(&self.config);
        self.rtc.unmask_interrupt();
        self.rtc.start();
        self.rtc.set_overflow_interrupt(true);

        info!(
            "tick engine started: {} bit counter, {} subticks per tick",
            self.config.counter_bits(),
            self.config.subticks_per_tick()
        );
    }

    /// The software part of the monotonic time, in ticks.
    pub fn overflow_extension(&self) -> u64 {
        let overflows = self.overflows.load(Ordering::Relaxed);
        compiler_fence(Ordering::Acquire);
        overflows as u64 * self.config.ticks_per_overflow()
    }

    /// Whole ticks per second.
    pub fn ticks_per_second(&self) -> u32 {
        self.config.tick_hz()
    }

    /// Returns a consistent snapshot of the extended counter.
    ///
    /// May be called from both, interrupt and thread context.
    pub fn now(&self) -> MonotonicTime {
        let lower_half_end = 1u32 << (self.config.counter_bits() - 1);
        loop {
            // The wrap count MUST be read before the counter, see module docs.
            let overflows = self.overflows.load(Ordering::Relaxed);
            compiler_fence(Ordering::Acquire);
            let counter = self.rtc.counter();
            let overflow_pending = self.rtc.is_overflow_pending();
            compiler_fence(Ordering::Acquire);

            if self.overflows.load(Ordering::Relaxed) != overflows {
                // The overflow interrupt preempted us.
                continue;
            }

            let unaccounted = overflow_pending && counter < lower_half_end;
            let overflows = overflows as u64 + unaccounted as u64;
            return self.combine(overflows, counter);
        }
    }

    fn combine(&self, overflows: u64, counter: u32) -> MonotonicTime {
        let subtick_mask = self.config.subticks_per_tick() - 1;
        MonotonicTime {
            ticks: overflows * self.config.ticks_per_overflow()
                + (counter >> self.config.subtick_bits()) as u64,
            subtick: (counter & subtick_mask) as u8,
        }
    }

    /// Starts forwarding whole ticks to the tick hook.
    pub fn enable_periodic_signal(&self) {
        self.periodic_signal.store(true, Ordering::Release);
        self.rtc.set_tick_interrupt(true);
    }

    /// Stops forwarding ticks. The hook will not be called after this returns.
    pub fn disable_periodic_signal(&self) {
        self.rtc.set_tick_interrupt(false);
        self.periodic_signal.store(false, Ordering::Release);
    }

    pub fn is_periodic_signal_enabled(&self) -> bool {
        self.periodic_signal.load(Ordering::Acquire)
    }

    /// Arms the comparator to raise an interrupt `after_ticks` ticks from now
    /// and returns the raw counter target.
    ///
    /// Leads shorter than the configured minimum are extended so that the
    /// target cannot be passed while it is being programmed. Leads longer
    /// than one counter period are clamped to the farthest representable
    /// target. Overwrites a pending target.
    pub fn schedule_wake(&self, after_ticks: u32) -> u32 {
        let lead_ticks = after_ticks.max(self.config.min_lead_ticks()) as u64;
        let counter_mask = self.config.counter_mask();
        let lead = (lead_ticks << self.config.subtick_bits()).min(counter_mask as u64) as u32;

        let counter = self.rtc.counter();
        let target = counter.wrapping_add(lead) & counter_mask;
        self.rtc.arm_compare(target);

        debug!("wake armed: counter {}, target {}", counter, target);
        target
    }

    /// Disarms a pending wake target. A no-op if none is armed.
    pub fn cancel_wake(&self) {
        self.rtc.disarm_compare();
    }

    /// The pending wake target (a raw counter value), if any.
    pub fn wake_target(&self) -> Option<u32> {
        self.rtc.armed_compare()
    }

    /// Entry point of the shared RTC interrupt: handles all pending events.
    ///
    /// Called exclusively from interrupt context.
    pub fn on_interrupt(&self) {
        while let Some(event) = self.rtc.take_event() {
            self.dispatch(event);
        }
    }

    /// Handles a single logical event of the RTC interrupt line.
    ///
    /// Called exclusively from interrupt context.
    pub fn dispatch(&self, event: RtcEvent) {
        match event {
            RtcEvent::Overflow => self.on_overflow(),
            RtcEvent::Tick => self.on_tick(),
            RtcEvent::Compare => self.on_compare(),
        }
    }

    fn on_overflow(&self) {
        let overflows = self.overflows.load(Ordering::Relaxed).wrapping_add(1);
        compiler_fence(Ordering::Release);
        self.overflows.store(overflows, Ordering::Relaxed);
        trace!("rtc overflow #{}", overflows);
    }

    fn on_tick(&self) {
        if !self.periodic_signal.load(Ordering::Acquire) {
            return;
        }

        // Subtick events arrive at subtick rate, only whole ticks are
        // forwarded.
        let subtick_mask = self.config.subticks_per_tick() - 1;
        if self.rtc.counter() & subtick_mask == 0 {
            self.hook.on_tick();
        }
    }

    fn on_compare(&self) {
        // One-shot: whoever waited for this wakes up when the CPU leaves its
        // wait state, nothing else to do here.
        self.rtc.disarm_compare();
    }
}
