//! Board support core for nRF52 ports: low-frequency clock bring-up, a tick
//! engine extending the 24 bit RTC to monotonic 64 bit time, low-power sleep
//! and brownout/fault/reset control.
//!
//! The core is hardware agnostic and talks to the chip through the traits in
//! [`driver`]. The nRF52 implementation lives in `driver::socs::nrf` and is
//! enabled with the `hardware` feature.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod driver;
pub mod port;
pub mod util;

pub use driver::{
    handshake::{BOOTLOADER_MAGIC, BootAction},
    power::{PowerThresholds, ResetReason},
    timer::{MonotonicTime, TickConfig},
};
pub use port::{Port, PortConfig, PortParts};
