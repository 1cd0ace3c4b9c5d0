use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{Ordering, compiler_fence},
};

/// Like [`core::cell::Cell`] but with volatile read/write semantics.
#[repr(transparent)]
pub struct VolatileCell<T> {
    value: UnsafeCell<T>,
}

impl<T> VolatileCell<T> {
    pub const fn new(value: T) -> Self {
        VolatileCell {
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        // Safety: UnsafeCell guarantees a dereferenceable pointer.
        unsafe { self.value.get().read_volatile() }
    }

    #[inline]
    pub fn set(&self, value: T)
    where
        T: Copy,
    {
        // Safety: UnsafeCell guarantees a dereferenceable pointer.
        unsafe { self.value.get().write_volatile(value) }
    }
}

/// A word of RAM that survives a warm reset.
///
/// Statics of this type are meant to be placed in a linker section that the
/// startup code neither zeroes nor initializes (`.uninit` with cortex-m-rt).
/// The memory therefore holds whatever was last written before a warm reset
/// and an arbitrary bit pattern after power loss.
///
/// # Safety
///
/// - Reading a [`RetainedCell::uninit()`] slot before any write is a platform
///   assumption, not something the Rust abstract machine defines: on
///   Cortex-M, SRAM always holds some bit pattern and the volatile load is
///   opaque to the compiler, so the read yields an arbitrary but fixed word.
///   Host builds only ever construct slots with [`RetainedCell::new()`] or
///   write before reading.
/// - Aligned u32 access does not tear on Cortex-M. Release/acquire compiler
///   fences order surrounding memory accesses the same way an atomic would on
///   a single core.
#[repr(transparent)]
pub struct RetainedCell {
    value: VolatileCell<MaybeUninit<u32>>,
}

impl RetainedCell {
    /// A slot without initializer, for use in a no-load section.
    pub const fn uninit() -> Self {
        Self {
            value: VolatileCell::new(MaybeUninit::uninit()),
        }
    }

    /// A slot with a defined start value, e.g. for host-side simulation.
    pub const fn new(value: u32) -> Self {
        Self {
            value: VolatileCell::new(MaybeUninit::new(value)),
        }
    }

    /// Returns the word last written, or the power-on content of the slot.
    #[inline]
    pub fn get(&self) -> u32 {
        let value = self.value.get();
        compiler_fence(Ordering::Acquire);
        // Safety: Platform assumption. The slot is either written or backed by
        //         device SRAM, which always carries a defined bit pattern.
        //         The volatile load keeps the compiler from treating it as
        //         uninitialized, see the type level docs.
        unsafe { value.assume_init() }
    }

    #[inline]
    pub fn set(&self, value: u32) {
        compiler_fence(Ordering::Release);
        self.value.set(MaybeUninit::new(value));
    }
}

// Safety: See safety notes of RetainedCell.
unsafe impl Sync for RetainedCell {}
