//! Hardware-agnostic time structures and the RTC interface consumed by the
//! tick engine.
//!
//! - [`TickConfig`] describes the counter geometry: raw counter width and how
//!   many subticks make up one tick. Both depend on the oscillator and the
//!   peripheral and are therefore configuration, not literals.
//! - [`MonotonicTime`] is the software-extended time value handed out by
//!   [`crate::driver::tick::TickEngine::now()`].
//! - [`RtcCounter`] abstracts the free-running counter peripheral, its
//!   comparator and its three interrupt sources ([`RtcEvent`]).
//! - [`TickHook`] is the external scheduler's once-per-tick notification.

use fugit::{TimerDurationU64, TimerInstantU64};

/// Counter geometry and scheduling constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickConfig {
    counter_bits: u32,
    subtick_bits: u32,
    min_lead_ticks: u32,
    subtick_hz: u32,
}

impl TickConfig {
    /// nRF RTC: 24 bit counter clocked at 32.768 kHz, 32 subticks per tick.
    pub const NRF_RTC: Self = Self::new(24, 5, 3, 32_768);

    /// `subtick_bits` is log2 of the number of subticks per tick.
    /// `min_lead_ticks` is the shortest wake lead that is guaranteed to lie
    /// ahead of the counter by the time the comparator has been written.
    pub const fn new(counter_bits: u32, subtick_bits: u32, min_lead_ticks: u32, subtick_hz: u32) -> Self {
        assert!(counter_bits >= 2 && counter_bits <= 32);
        assert!(subtick_bits < counter_bits);
        // The subtick remainder must fit into a u8.
        assert!(subtick_bits <= 8);
        assert!(min_lead_ticks > 0);
        assert!(subtick_hz % (1 << subtick_bits) == 0);
        Self {
            counter_bits,
            subtick_bits,
            min_lead_ticks,
            subtick_hz,
        }
    }

    pub const fn counter_bits(&self) -> u32 {
        self.counter_bits
    }

    pub const fn subtick_bits(&self) -> u32 {
        self.subtick_bits
    }

    pub const fn min_lead_ticks(&self) -> u32 {
        self.min_lead_ticks
    }

    pub const fn subtick_hz(&self) -> u32 {
        self.subtick_hz
    }

    /// Largest representable raw counter value.
    pub const fn counter_mask(&self) -> u32 {
        (((1u64) << self.counter_bits) - 1) as u32
    }

    pub const fn subticks_per_tick(&self) -> u32 {
        1 << self.subtick_bits
    }

    /// The amount the overflow extension advances per counter wrap.
    pub const fn ticks_per_overflow(&self) -> u64 {
        1 << (self.counter_bits - self.subtick_bits)
    }

    pub const fn tick_hz(&self) -> u32 {
        self.subtick_hz >> self.subtick_bits
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::NRF_RTC
    }
}

const _: () = {
    let config = TickConfig::NRF_RTC;
    assert!(config.counter_mask() == 0xff_ffff);
    assert!(config.subticks_per_tick() == 32);
    assert!(config.ticks_per_overflow() == 1 << 19);
    assert!(config.tick_hz() == 1024);
};

/// Monotonic time as (whole ticks, subtick remainder).
///
/// Ordering is chronological.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonotonicTime {
    pub ticks: u64,
    pub subtick: u8,
}

impl MonotonicTime {
    pub const fn new(ticks: u64, subtick: u8) -> Self {
        Self { ticks, subtick }
    }

    /// Flattens the value into subticks.
    pub const fn as_subticks(&self, config: &TickConfig) -> u64 {
        (self.ticks << config.subtick_bits()) | self.subtick as u64
    }

    /// Whole ticks as an instant of a tick clock running at `TICK_HZ`.
    pub const fn instant<const TICK_HZ: u32>(&self) -> TimerInstantU64<TICK_HZ> {
        TimerInstantU64::from_ticks(self.ticks)
    }

    /// Whole ticks elapsed since the tick engine was started.
    pub const fn as_duration<const TICK_HZ: u32>(&self) -> TimerDurationU64<TICK_HZ> {
        TimerDurationU64::from_ticks(self.ticks)
    }

    /// Milliseconds since start for the default 1024 Hz tick.
    pub fn as_millis(&self) -> u64 {
        self.as_duration::<1024>().to_millis()
    }
}

/// The logical interrupt sources sharing the RTC interrupt line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcEvent {
    /// The raw counter wrapped to zero.
    Overflow,

    /// The raw counter advanced by one subtick.
    Tick,

    /// The raw counter reached the comparator value.
    Compare,
}

/// Free-running wrap-around counter peripheral with one comparator channel.
///
/// All methods take `&self`: implementations are thin register wrappers that
/// are shared between thread and interrupt context.
pub trait RtcCounter {
    /// Programs the rate divider so that the counter advances at
    /// [`TickConfig::subtick_hz()`].
    fn configure(&self, config: &TickConfig);

    /// Clears the counter to zero.
    fn clear(&self);

    /// Starts counting.
    fn start(&self);

    /// Acknowledges all pending events without reporting them.
    fn clear_events(&self);

    /// Current raw counter value.
    fn counter(&self) -> u32;

    fn set_overflow_interrupt(&self, enabled: bool);

    /// Returns `true` if the counter wrapped but the overflow event has not
    /// yet been acknowledged by the interrupt handler.
    fn is_overflow_pending(&self) -> bool;

    fn set_tick_interrupt(&self, enabled: bool);

    /// Arms the comparator: a compare event will be raised once when the
    /// counter reaches `value`. Replaces any previously armed value.
    fn arm_compare(&self, value: u32);

    /// Disables the compare interrupt and clears the comparator.
    fn disarm_compare(&self);

    /// The armed comparator value, if any.
    fn armed_compare(&self) -> Option<u32>;

    /// Acknowledges and returns one pending event whose interrupt is enabled.
    ///
    /// Overflow events MUST be reported before any other event.
    fn take_event(&self) -> Option<RtcEvent>;

    /// Sets the interrupt priority and unmasks the counter's interrupt line.
    fn unmask_interrupt(&self);
}

impl<T: RtcCounter + ?Sized> RtcCounter for &T {
    fn configure(&self, config: &TickConfig) {
        (**self).configure(config)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn start(&self) {
        (**self).start()
    }

    fn clear_events(&self) {
        (**self).clear_events()
    }

    fn counter(&self) -> u32 {
        (**self).counter()
    }

    fn set_overflow_interrupt(&self, enabled: bool) {
        (**self).set_overflow_interrupt(enabled)
    }

    fn is_overflow_pending(&self) -> bool {
        (**self).is_overflow_pending()
    }

    fn set_tick_interrupt(&self, enabled: bool) {
        (**self).set_tick_interrupt(enabled)
    }

    fn arm_compare(&self, value: u32) {
        (**self).arm_compare(value)
    }

    fn disarm_compare(&self) {
        (**self).disarm_compare()
    }

    fn armed_compare(&self) -> Option<u32> {
        (**self).armed_compare()
    }

    fn take_event(&self) -> Option<RtcEvent> {
        (**self).take_event()
    }

    fn unmask_interrupt(&self) {
        (**self).unmask_interrupt()
    }
}

/// Notification sink of the external scheduler, called from interrupt
/// context once per whole tick while the periodic signal is enabled.
pub trait TickHook {
    fn on_tick(&self);
}

impl TickHook for fn() {
    fn on_tick(&self) {
        self()
    }
}

impl<T: TickHook + ?Sized> TickHook for &T {
    fn on_tick(&self) {
        (**self).on_tick()
    }
}

/// For ports that never enable the periodic signal.
impl TickHook for () {
    fn on_tick(&self) {}
}
