use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    ops::Deref,
    sync::atomic::{AtomicU8, Ordering},
};

/// Initialization state.
#[repr(u8)]
enum InitializationState {
    Uninitialized,
    Initializing,
    Initialized,
}

/// Static-friendly slot for an object that is constructed once at program
/// start and shared with interrupt handlers afterwards.
///
/// Interrupt vectors are the only place that needs to reach board state
/// through a static. Everything else should receive the `&'static` reference
/// returned by [`InitCell::init()`].
///
/// Inherits [`Send`] and [`Sync`] from T.
///
/// # Panics
///
/// Panics when initialized twice or dereferenced before initialization. With
/// the 'unsafe-optimize' feature enabled in release builds, dereferencing
/// before initialization triggers UB instead. Code that may run before
/// initialization (e.g. fault handlers) checks
/// [`InitCell::is_initialized()`] first, which is available in all builds.
pub struct InitCell<T> {
    init_state: AtomicU8,

    inner: UnsafeCell<MaybeUninit<T>>,
}

// Safety: Access to UnsafeCell is mediated via an atomic.
unsafe impl<T: Send> Send for InitCell<T> {}

// Safety: Access to UnsafeCell is mediated via an atomic.
unsafe impl<T: Sync> Sync for InitCell<T> {}

impl<T> InitCell<T> {
    pub const fn uninit() -> Self {
        Self {
            init_state: AtomicU8::new(InitializationState::Uninitialized as u8),
            inner: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.init_state.load(Ordering::Acquire) == InitializationState::Initialized as u8
    }

    /// Moves the value into the cell and hands out the shared reference that
    /// the rest of the program should use.
    pub fn init(&'static self, value: T) -> &'static T {
        // Safety: Atomically acquires the slot for globally exclusive access.
        #[cfg(any(not(feature = "unsafe-optimize"), debug_assertions))]
        self.init_state
            .compare_exchange(
                InitializationState::Uninitialized as u8,
                InitializationState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .expect("initialized twice");

        // Safety: We acquired the slot above. Nobody dereferences it before the
        //         state is released below.
        let inner = unsafe { (*self.inner.get()).write(value) };

        self.init_state
            .store(InitializationState::Initialized as u8, Ordering::Release);

        inner
    }
}

impl<T> Deref for InitCell<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        #[cfg(any(not(feature = "unsafe-optimize"), debug_assertions))]
        assert!(self.is_initialized());

        // Safety: The value was written before the state became initialized
        //         and is never moved out again.
        unsafe { (*self.inner.get()).assume_init_ref() }
    }
}
