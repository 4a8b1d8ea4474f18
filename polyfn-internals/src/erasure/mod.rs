//! The erasures that can occupy the slot of a [`RawFunction`].
//!
//! Every erasure owns one payload and knows how to reach it from the slot:
//!
//! - [`Local`]: the payload lives directly inside the slot
//! - [`Pointer`]: a `Copy` pointer-like payload inside the slot
//! - [`Allocated`]: the payload lives behind a pointer obtained from an
//!   [`Allocator`], and the allocator is kept next to the pointer
//!
//! The empty state is not an erasure; it is represented by
//! [`FunctionVtable::empty`], whose target access never yields a payload.
//!
//! [`RawFunction`]: crate::RawFunction
//! [`FunctionVtable::empty`]: crate::function::vtable::FunctionVtable::empty
//! [`Allocator`]: allocator_api2::alloc::Allocator

use core::{mem::MaybeUninit, ptr::NonNull};

mod allocated;
mod local;
mod pointer;

pub use self::{allocated::Allocated, local::Local, pointer::Pointer};

/// Number of machine words in the inline slot.
const SLOT_WORDS: usize = 3;

/// Inline storage of a [`RawFunction`](crate::RawFunction).
///
/// Pointer-sized words give the slot pointer alignment, and keep any pointer
/// stored in it (such as the handle of an [`Allocated`]) intact when the slot
/// is moved.
pub type Slot = MaybeUninit<[*const (); SLOT_WORDS]>;

/// Number of bytes available for a payload stored inline.
pub const INLINE_CAPACITY: usize = size_of::<Slot>();

/// Returns whether a payload of type `P` is stored inline.
///
/// This is decided once per type: a payload is stored inline when both its
/// size and its alignment fit the slot. Moves never fail in Rust, so there is
/// no further condition.
#[inline]
pub const fn fits_inline<P>() -> bool {
    size_of::<P>() <= size_of::<Slot>() && align_of::<P>() <= align_of::<Slot>()
}

/// Marker used as the target type of an empty function.
///
/// No payload can have this type, since it is private to this crate and does
/// not implement any closure trait.
pub(crate) struct Empty;

/// A strategy for holding a payload inside a [`Slot`].
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. `size_of::<Self>()` and `align_of::<Self>()` fit the [`Slot`] whenever
///    a value of `Self` is constructed.
/// 2. [`Erasure::payload`] returns a pointer to a valid `Self::Payload` that
///    stays valid until the erasure is dropped or released.
/// 3. [`Erasure::release`] frees everything owned by the erasure except the
///    payload itself.
pub unsafe trait Erasure: Sized + 'static {
    /// The callable stored by this erasure.
    type Payload: 'static;

    /// Returns a pointer to the payload of the erasure stored in `slot`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds an initialized `Self`.
    unsafe fn payload(slot: NonNull<Slot>) -> NonNull<Self::Payload>;

    /// Frees the resources of the erasure in `slot` after its payload has
    /// been moved out.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds an initialized `Self`.
    /// 2. The payload has already been moved out of the erasure, so it must
    ///    not be dropped again.
    /// 3. The slot is considered uninitialized after this call.
    unsafe fn release(slot: NonNull<Slot>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_layout() {
        assert_eq!(INLINE_CAPACITY, 3 * size_of::<usize>());
        assert_eq!(align_of::<Slot>(), align_of::<usize>());
    }

    #[test]
    fn test_fits_inline() {
        assert!(fits_inline::<()>());
        assert!(fits_inline::<fn(i32) -> i32>());
        assert!(fits_inline::<[usize; 3]>());
        assert!(!fits_inline::<[usize; 4]>());
        assert!(!fits_inline::<[u64; 8]>());

        #[repr(align(64))]
        struct OverAligned(#[allow(dead_code)] u8);
        assert!(!fits_inline::<OverAligned>());
    }
}
