use core::ptr::NonNull;

use crate::erasure::{Erasure, Slot};

/// Erasure storing its payload directly inside the slot.
///
/// Only used for payloads satisfying [`fits_inline`](crate::fits_inline).
#[derive(Clone)]
#[repr(transparent)]
pub struct Local<P> {
    /// The stored callable.
    payload: P,
}

impl<P> Local<P> {
    /// Wraps a payload for inline storage.
    #[inline]
    pub(crate) fn new(payload: P) -> Self {
        Self { payload }
    }
}

// SAFETY:
// 1. `RawFunction` only constructs `Local<P>` after checking `fits_inline::<P>()`,
//    and `Local<P>` has the layout of `P` because of `#[repr(transparent)]`.
// 2. The payload is the erasure itself, so it lives exactly as long as the slot
//    content.
// 3. A `Local<P>` owns nothing besides its payload.
unsafe impl<P: 'static> Erasure for Local<P> {
    type Payload = P;

    #[inline]
    unsafe fn payload(slot: NonNull<Slot>) -> NonNull<P> {
        let this: *mut Self = slot.cast::<Self>().as_ptr();
        // SAFETY: `this` points to an initialized `Self` (guaranteed by the caller),
        // so projecting to its field stays in bounds.
        let payload: *mut P = unsafe { &raw mut (*this).payload };
        // SAFETY: A field projection of a non-null pointer is non-null.
        unsafe { NonNull::new_unchecked(payload) }
    }

    #[inline]
    unsafe fn release(_slot: NonNull<Slot>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_is_transparent() {
        assert_eq!(size_of::<Local<u64>>(), size_of::<u64>());
        assert_eq!(size_of::<Local<()>>(), 0);
        assert_eq!(align_of::<Local<u16>>(), align_of::<u16>());
    }
}
