pub mod clock;
pub mod cpu;
pub mod handshake;
pub mod power;
pub mod sleep;
pub mod tick;
pub mod timer;

#[cfg(feature = "hardware")]
pub mod socs;

#[cfg(test)]
pub(crate) mod sim;
