//! Allocator-backed erasure.
//!
//! This module encapsulates the fields of [`Allocated`], ensuring the pointer
//! can only be created by [`Allocated::try_new`] or [`Clone::clone`]. This
//! guarantees the safety invariant: **`ptr` always points to an initialized
//! `P` living in a block obtained from `alloc` with `Layout::new::<P>()`**.

use alloc::alloc::handle_alloc_error;
use core::{alloc::Layout, mem::ManuallyDrop, ptr::NonNull};

use allocator_api2::alloc::{AllocError, Allocator};

use crate::erasure::{Erasure, Slot};

/// Erasure storing its payload in a block obtained from an [`Allocator`].
///
/// The allocator travels with the erasure: the slot holds both the pointer to
/// the payload and the allocator instance that produced it, so destruction and
/// cloning always go through the same allocator.
pub struct Allocated<P, A: Allocator> {
    /// Pointer to the payload.
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer was returned by `alloc.allocate(Layout::new::<P>())`.
    /// 2. The pointee is an initialized `P` owned by this struct, except after
    ///    [`Erasure::release`] moved it out.
    ptr: NonNull<P>,
    /// The allocator that owns the block behind `ptr`.
    alloc: A,
}

impl<P, A: Allocator> Allocated<P, A> {
    /// Allocates a block for `payload` from `alloc` and moves the payload
    /// into it.
    ///
    /// Fails to compile if the erasure does not fit the inline slot, which can
    /// only happen for allocators larger than two machine words.
    pub(crate) fn try_new(payload: P, alloc: A) -> Result<Self, AllocError> {
        const {
            assert!(
                size_of::<Self>() <= size_of::<Slot>() && align_of::<Self>() <= align_of::<Slot>(),
                "allocator is too big for the inline slot"
            );
        }

        let ptr = alloc.allocate(Layout::new::<P>())?.cast::<P>();

        // SAFETY: The block was just allocated with the layout of `P`, so it is
        // valid for writes of a `P` and not aliased.
        unsafe {
            ptr.write(payload);
        }

        Ok(Self { ptr, alloc })
    }
}

impl<P, A: Allocator> Drop for Allocated<P, A> {
    fn drop(&mut self) {
        let _deallocate = Deallocate {
            alloc: &self.alloc,
            ptr: self.ptr,
        };

        // SAFETY: The pointee is initialized and owned by `self` (invariants 1
        // and 2). The block is released by `_deallocate` afterwards, even if
        // the payload's destructor panics.
        unsafe {
            self.ptr.drop_in_place();
        }
    }
}

impl<P: Clone, A: Allocator + Clone> Clone for Allocated<P, A> {
    fn clone(&self) -> Self {
        let alloc = self.alloc.clone();
        let layout = Layout::new::<P>();
        let ptr = match alloc.allocate(layout) {
            Ok(block) => block.cast::<P>(),
            Err(AllocError) => handle_alloc_error(layout),
        };

        let deallocate = Deallocate {
            alloc: &alloc,
            ptr,
        };

        // SAFETY: `self.ptr` points to an initialized `P` owned by `self`
        // (invariant 2), and we only create a shared reference to it.
        let payload = unsafe { self.ptr.as_ref() }.clone();

        // SAFETY: The block was just allocated with the layout of `P`.
        unsafe {
            ptr.write(payload);
        }

        // The block now belongs to the new erasure.
        core::mem::forget(deallocate);

        Self { ptr, alloc }
    }
}

// SAFETY:
// 1. `try_new` asserts at compile time that `Self` fits the slot.
// 2. `ptr` points to the payload for as long as the erasure is alive
//    (invariant 2).
// 3. `release` deallocates the block and drops the allocator without touching
//    the payload.
unsafe impl<P: 'static, A: Allocator + 'static> Erasure for Allocated<P, A> {
    type Payload = P;

    #[inline]
    unsafe fn payload(slot: NonNull<Slot>) -> NonNull<P> {
        // SAFETY: The slot holds an initialized `Self` (guaranteed by the caller).
        let this: &Self = unsafe { slot.cast::<Self>().as_ref() };
        this.ptr
    }

    unsafe fn release(slot: NonNull<Slot>) {
        // SAFETY: The slot holds an initialized `Self` and is considered
        // uninitialized afterwards (guaranteed by the caller), so we can take
        // ownership of it. `ManuallyDrop` keeps the payload from being dropped
        // a second time.
        let this = ManuallyDrop::new(unsafe { slot.cast::<Self>().read() });

        // SAFETY: `this` is never used or dropped after this read, so the
        // allocator is moved out exactly once.
        let alloc: A = unsafe { core::ptr::read(&this.alloc) };

        core::mem::drop(Deallocate {
            alloc: &alloc,
            ptr: this.ptr,
        });
    }
}

/// Returns a block to its allocator when dropped.
///
/// Used to release the block of an [`Allocated`] on every exit path,
/// including unwinding out of a payload's `Clone` or `Drop` implementation.
struct Deallocate<'a, P, A: Allocator> {
    /// The allocator that produced the block.
    alloc: &'a A,
    /// The block, allocated with `Layout::new::<P>()`.
    ptr: NonNull<P>,
}

impl<P, A: Allocator> Drop for Deallocate<'_, P, A> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc.allocate(Layout::new::<P>())` and
        // is deallocated exactly once, here.
        unsafe {
            self.alloc
                .deallocate(self.ptr.cast::<u8>(), Layout::new::<P>());
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec};

    use allocator_api2::alloc::Global;

    use super::*;

    #[test]
    fn test_allocated_size() {
        assert_eq!(
            size_of::<Allocated<[u64; 8], Global>>(),
            size_of::<usize>()
        );
        assert_eq!(
            size_of::<Allocated<String, &'static Global>>(),
            2 * size_of::<usize>()
        );
    }

    #[test]
    fn test_allocated_clone_is_deep() {
        let original = Allocated::try_new(vec![1, 2, 3], Global).unwrap();
        let cloned = original.clone();

        assert_ne!(original.ptr, cloned.ptr);
        // SAFETY: Both erasures are alive and own their payloads.
        let original_payload = unsafe { original.ptr.as_ref() };
        // SAFETY: Same as above.
        let cloned_payload = unsafe { cloned.ptr.as_ref() };
        assert_eq!(original_payload, cloned_payload);
    }
}
