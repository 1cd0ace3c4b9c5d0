//! State that survives a warm reset.
//!
//! - The boot sentinel is a retained register. Writing [`BOOTLOADER_MAGIC`]
//!   before a reset asks the startup code to enter the bootloader instead of
//!   the application.
//! - The saved word is a RAM word outside the zero-initialized sections. Its
//!   content is undefined after power-on but preserved across warm resets.

use crate::util::sync::volatile_cell::RetainedCell;

/// Sentinel value requesting the bootloader on the next boot.
pub const BOOTLOADER_MAGIC: u32 = 0x4e;

/// A general purpose register retained across warm resets.
pub trait RetainedRegister {
    fn read(&self) -> u32;
    fn write(&self, value: u32);
}

impl<T: RetainedRegister + ?Sized> RetainedRegister for &T {
    fn read(&self) -> u32 {
        (**self).read()
    }

    fn write(&self, value: u32) {
        (**self).write(value)
    }
}

/// A word of memory retained across warm resets.
pub trait RetainedWord {
    fn get(&self) -> u32;
    fn set(&self, value: u32);
}

impl<T: RetainedWord + ?Sized> RetainedWord for &T {
    fn get(&self) -> u32 {
        (**self).get()
    }

    fn set(&self, value: u32) {
        (**self).set(value)
    }
}

impl RetainedWord for RetainedCell {
    fn get(&self) -> u32 {
        RetainedCell::get(self)
    }

    fn set(&self, value: u32) {
        RetainedCell::set(self, value)
    }
}

/// What the startup code should do after a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootAction {
    Normal,
    EnterBootloader,
}

pub struct BootHandshake<R: RetainedRegister, W: RetainedWord> {
    sentinel: R,
    saved_word: W,
}

impl<R: RetainedRegister, W: RetainedWord> BootHandshake<R, W> {
    pub const fn new(sentinel: R, saved_word: W) -> Self {
        Self {
            sentinel,
            saved_word,
        }
    }

    /// Raw sentinel value.
    pub fn sentinel(&self) -> u32 {
        self.sentinel.read()
    }

    pub fn is_bootloader_requested(&self) -> bool {
        self.sentinel.read() == BOOTLOADER_MAGIC
    }

    /// Writes the bootloader request. Takes effect with the next reset.
    pub fn request_bootloader(&self) {
        self.sentinel.write(BOOTLOADER_MAGIC);
    }

    /// Consults the sentinel once per boot: a pending request is consumed so
    /// that the following reset boots normally again.
    pub fn take_boot_action(&self) -> BootAction {
        if self.is_bootloader_requested() {
            self.sentinel.write(0);
            BootAction::EnterBootloader
        } else {
            BootAction::Normal
        }
    }

    /// Undefined after power-on.
    pub fn saved_word(&self) -> u32 {
        self.saved_word.get()
    }

    pub fn set_saved_word(&self, value: u32) {
        self.saved_word.set(value);
    }
}
