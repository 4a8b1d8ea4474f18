use core::ptr::NonNull;

use crate::erasure::{Erasure, Slot, fits_inline};

/// Erasure for pointer-like callables: function pointers, `&'static F` and
/// other small `Copy` callables.
///
/// A `Pointer` is never built from an absent value. Construction goes through
/// [`RawFunction::from_ptr`], which turns `None` into an empty function, so a
/// stored pointer is always callable.
///
/// [`RawFunction::from_ptr`]: crate::RawFunction::from_ptr
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Pointer<P: Copy> {
    /// The stored pointer-like callable.
    ptr: P,
}

impl<P: Copy> Pointer<P> {
    /// Wraps a pointer-like callable.
    ///
    /// Fails to compile if `P` does not fit the inline slot.
    #[inline]
    pub(crate) fn new(ptr: P) -> Self {
        const {
            assert!(
                fits_inline::<P>(),
                "pointer-like callable is too big for the inline slot"
            );
        }
        Self { ptr }
    }
}

// SAFETY:
// 1. The inline const assertion in `Pointer::new` rejects any `P` that does not
//    fit the slot, and `Pointer<P>` has the layout of `P`.
// 2. The payload is the erasure itself.
// 3. A `Pointer<P>` owns nothing besides its payload, which is `Copy`.
unsafe impl<P: Copy + 'static> Erasure for Pointer<P> {
    type Payload = P;

    #[inline]
    unsafe fn payload(slot: NonNull<Slot>) -> NonNull<P> {
        let this: *mut Self = slot.cast::<Self>().as_ptr();
        // SAFETY: `this` points to an initialized `Self` (guaranteed by the caller),
        // so projecting to its field stays in bounds.
        let payload: *mut P = unsafe { &raw mut (*this).ptr };
        // SAFETY: A field projection of a non-null pointer is non-null.
        unsafe { NonNull::new_unchecked(payload) }
    }

    #[inline]
    unsafe fn release(_slot: NonNull<Slot>) {}
}
