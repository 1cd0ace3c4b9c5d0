use core::marker::PhantomData;

use paste::paste;

/// A trait representing the number of priority bits on a given ARMv7/8
/// platform.
///
/// Values between two and eight are allowed in principle, see
/// <https://developer.arm.com/documentation/107706/0100/Exceptions-and-interrupts-overview/Exception-priority-level-definitions>.
///
/// Only the nRF52's three priority bits are instantiated.
pub trait PriorityBits: Copy {
    const PRIORITY_BITS: usize;
}

macro_rules! impl_priority_bits {
    ($($num_priority_bits:literal),+) => {
        paste! {
            $(
                #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
                pub struct [<PB$num_priority_bits>];
                impl PriorityBits for [<PB$num_priority_bits>] {
                    const PRIORITY_BITS: usize = $num_priority_bits;
                }
            )+
        }
    };
}

impl_priority_bits!(3);

/// Logical ARMv7/8 interrupt priority.
///
/// Logical priorities grow with urgency, NVIC priorities shrink: 1 is the
/// lowest interrupt priority, 2^num_priority_bits the highest configurable
/// one. Thread mode and faults are not represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExecutionPriority<PB: PriorityBits>(u8, PhantomData<PB>);

impl<PB: PriorityBits> ExecutionPriority<PB> {
    const _CHECK_PRIORITY_BITS: () = {
        assert!(PB::PRIORITY_BITS < 8);
    };

    const HIGHEST_U8: u8 = 2u8.pow(PB::PRIORITY_BITS as u32);

    /// Left-aligned NVIC representation as expected by the IPR registers.
    #[inline]
    pub const fn to_arm_nvic_repr(self) -> u8 {
        self.to_nvic_level() << (8 - PB::PRIORITY_BITS)
    }

    /// Right-aligned NVIC priority level, i.e. the number vendor SDKs and
    /// datasheets use ("priority 6").
    #[inline]
    pub const fn to_nvic_level(self) -> u8 {
        Self::HIGHEST_U8 - self.0
    }

    /// Inverse of [`ExecutionPriority::to_nvic_level()`].
    pub const fn from_nvic_level(level: u8) -> Result<Self, ()> {
        if level >= Self::HIGHEST_U8 {
            Err(())
        } else {
            Ok(Self(Self::HIGHEST_U8 - level, PhantomData))
        }
    }
}
