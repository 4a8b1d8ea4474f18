//! The type-erased function container.
//!
//! This module encapsulates the fields of [`RawFunction`]. Since the fields
//! can only be set from within this module, the safety invariant can be
//! verified locally: **the slot always holds an initialized erasure whose
//! type matches the vtable, and the payload implements every signature of
//! `S`**.

use alloc::alloc::handle_alloc_error;
use core::{
    alloc::Layout,
    any::TypeId,
    cell::UnsafeCell,
    marker::PhantomData,
    mem::{ManuallyDrop, MaybeUninit},
    ptr::NonNull,
};

use allocator_api2::alloc::{AllocError, Allocator, Global};

use crate::{
    erasure::{Allocated, Erasure, Local, Pointer, Slot, fits_inline},
    function::vtable::{Cloning, FunctionVtable},
    signature::{ByMut, ByRef, ByValue, Callable, Select, SignatureSet},
    util::Erased,
};

/// A type-erased callable with the signature set `S`.
///
/// The payload lives in an inline slot of
/// [`INLINE_CAPACITY`](crate::INLINE_CAPACITY) bytes when it fits, and behind
/// an allocation otherwise. Every operation goes through the
/// [`FunctionVtable`] matching the erasure currently in the slot.
///
/// A `RawFunction` knows nothing about thread safety or cloneability. It is
/// neither `Send` nor `Sync`, and cloning is only available through the
/// unsafe [`RawFunction::clone_unchecked`]. Wrappers decide which payloads
/// are accepted and expose the matching safe API.
pub struct RawFunction<S: ?Sized> {
    /// The vtable of the erasure stored in `slot`.
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The vtable is either [`FunctionVtable::empty`] or was created for
    ///    the signature set `S` and the erasure stored in `slot`.
    vtable: &'static FunctionVtable,
    /// Storage for the erasure.
    ///
    /// The cell allows [`RawFunction::call_const_unchecked`] to reach the
    /// payload mutably through a shared reference.
    slot: UnsafeCell<Slot>,
    /// Ties the function to its signature set.
    _marker: PhantomData<*const S>,
}

/// Frees the erasure of a consumed function, even if its payload panics.
struct ReleaseOnDrop {
    /// The vtable of the erasure.
    vtable: &'static FunctionVtable,
    /// The slot holding the erasure.
    slot: NonNull<Slot>,
}

impl Drop for ReleaseOnDrop {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `ReleaseOnDrop` is only created by `RawFunction::call_once`
        // for a slot whose payload is being moved out, and which is never
        // used again.
        unsafe {
            self.vtable.release(self.slot);
        }
    }
}

impl<S: ?Sized> RawFunction<S> {
    /// Creates an empty function.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            vtable: FunctionVtable::empty(),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
            _marker: PhantomData,
        }
    }

    /// Returns a pointer to the slot.
    #[inline]
    fn slot(&self) -> NonNull<Slot> {
        NonNull::from(&self.slot).cast::<Slot>()
    }

    /// Moves `erasure` into the slot of a new function.
    fn from_erasure<E, K>(erasure: E) -> Self
    where
        S: SignatureSet,
        E: Erasure,
        E::Payload: Callable<S>,
        K: Cloning<E>,
    {
        debug_assert!(fits_inline::<E>());

        let mut slot: Slot = MaybeUninit::uninit();
        let slot_ptr = NonNull::from(&mut slot).cast::<E>();
        // SAFETY: Every erasure fits the slot (guaranteed by `Erasure`), and
        // the slot is uninitialized so nothing is overwritten.
        unsafe {
            slot_ptr.write(erasure);
        }

        Self {
            vtable: FunctionVtable::new::<S, E, K>(),
            slot: UnsafeCell::new(slot),
            _marker: PhantomData,
        }
    }

    /// Creates a function holding `payload`.
    ///
    /// The payload is stored inline if [`fits_inline`] allows it, and in a
    /// block of the global allocator otherwise.
    pub fn new<P, K>(payload: P) -> Self
    where
        S: SignatureSet,
        P: Callable<S>,
        K: Cloning<Local<P>> + Cloning<Allocated<P, Global>>,
    {
        if fits_inline::<P>() {
            Self::from_erasure::<Local<P>, K>(Local::new(payload))
        } else {
            match Allocated::try_new(payload, Global) {
                Ok(erasure) => Self::from_erasure::<Allocated<P, Global>, K>(erasure),
                Err(AllocError) => handle_alloc_error(Layout::new::<P>()),
            }
        }
    }

    /// Creates a function holding `payload`, allocated from `alloc` if it
    /// does not fit inline.
    ///
    /// Payloads that fit inline are stored inline and `alloc` is dropped.
    pub fn try_new_in<P, A, K>(payload: P, alloc: A) -> Result<Self, AllocError>
    where
        S: SignatureSet,
        P: Callable<S>,
        A: Allocator + 'static,
        K: Cloning<Local<P>> + Cloning<Allocated<P, A>>,
    {
        if fits_inline::<P>() {
            Ok(Self::from_erasure::<Local<P>, K>(Local::new(payload)))
        } else {
            let erasure = Allocated::try_new(payload, alloc)?;
            Ok(Self::from_erasure::<Allocated<P, A>, K>(erasure))
        }
    }

    /// Like [`RawFunction::try_new_in`], but calls [`handle_alloc_error`] if
    /// the allocation fails.
    pub fn new_in<P, A, K>(payload: P, alloc: A) -> Self
    where
        S: SignatureSet,
        P: Callable<S>,
        A: Allocator + 'static,
        K: Cloning<Local<P>> + Cloning<Allocated<P, A>>,
    {
        match Self::try_new_in::<P, A, K>(payload, alloc) {
            Ok(function) => function,
            Err(AllocError) => handle_alloc_error(Layout::new::<P>()),
        }
    }

    /// Creates a function holding a pointer-like callable, or an empty
    /// function if `ptr` is `None`.
    ///
    /// Fails to compile if `P` does not fit the inline slot.
    pub fn from_ptr<P, K>(ptr: Option<P>) -> Self
    where
        S: SignatureSet,
        P: Callable<S> + Copy,
        K: Cloning<Pointer<P>>,
    {
        match ptr {
            Some(ptr) => Self::from_erasure::<Pointer<P>, K>(Pointer::new(ptr)),
            None => Self::empty(),
        }
    }

    /// Clones the function by cloning its erasure.
    ///
    /// If the payload's `Clone` implementation panics, nothing is leaked and
    /// `self` is unaffected.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The function was created with the [`DeepClone`] mode, or is empty.
    ///
    /// [`DeepClone`]: crate::DeepClone
    pub unsafe fn clone_unchecked(&self) -> Self {
        let mut cloned = Self::empty();

        // SAFETY:
        // 1. The slot of `self` holds the erasure of `self.vtable` (invariant 1).
        // 2. The slot of `cloned` holds an empty erasure, which needs no
        //    dropping and is overwritten.
        // 3. Guaranteed by the caller (1).
        unsafe {
            self.vtable.clone(self.slot(), cloned.slot());
        }

        // The slot of `cloned` now holds a clone of the erasure of `self`, so
        // the vtable of `self` applies to it. Until this point `cloned` was
        // empty, so a panic in `clone` drops nothing.
        cloned.vtable = self.vtable;
        cloned
    }

    /// Returns whether the function holds no payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vtable.is_empty()
    }

    /// Gets the [`TypeId`] of the payload, or `None` if the function is
    /// empty.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        if self.is_empty() {
            None
        } else {
            Some(self.vtable.type_id())
        }
    }

    /// Gets the type name of the payload, or `None` if the function is empty.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        if self.is_empty() {
            None
        } else {
            Some(self.vtable.type_name())
        }
    }

    /// Returns a pointer to the payload, or `None` if the function is empty.
    #[inline]
    fn payload(&self) -> Option<NonNull<Erased>> {
        // SAFETY: The slot holds the erasure of `self.vtable` (invariant 1).
        unsafe { self.vtable.target(self.slot()) }
    }

    /// Returns a reference to the payload if it has type `P`.
    #[inline]
    pub fn target<P: 'static>(&self) -> Option<&P> {
        if self.vtable.type_id() != TypeId::of::<P>() {
            return None;
        }
        let payload = self.payload()?;

        // SAFETY: The payload has type `P`, since the type ids match. It lives
        // as long as `self` is borrowed.
        let payload: &P = unsafe { payload.cast::<P>().as_ref() };
        Some(payload)
    }

    /// Returns a mutable reference to the payload if it has type `P`.
    #[inline]
    pub fn target_mut<P: 'static>(&mut self) -> Option<&mut P> {
        if self.vtable.type_id() != TypeId::of::<P>() {
            return None;
        }
        let payload = self.payload()?;

        // SAFETY: The payload has type `P`, since the type ids match. We have
        // exclusive access to `self`, so no other reference to it exists.
        let payload: &mut P = unsafe { payload.cast::<P>().as_mut() };
        Some(payload)
    }

    /// Invokes the entry at `index`, without consuming the payload.
    ///
    /// Returns `None` if the function is empty.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The signature at `index` takes `Args`, returns `R` and does not move
    ///    the payload out.
    /// 2. If the signature requires mutable access, no other reference to the
    ///    payload is alive for the duration of the call.
    #[inline]
    unsafe fn invoke<Args, R>(&self, index: usize, args: Args) -> Option<R> {
        let payload = self.payload()?;

        // SAFETY: The function is not empty since it has a payload, so
        // `index` is in bounds and the signature types match (guaranteed by
        // the caller (1) and invariant 1).
        let entry = unsafe { self.vtable.entry::<Args, R>(index) };

        // SAFETY: `payload` points to the payload the entry was generated for
        // (invariant 1). Aliasing is guaranteed by the caller (2).
        Some(unsafe { entry(payload, args) })
    }

    /// Invokes the signature selected by `Args` through a shared reference.
    ///
    /// Returns `None` if the function is empty.
    #[inline]
    pub fn call_ref<Args, I>(&self, args: Args) -> Option<<S as Select<ByRef, Args, I>>::Output>
    where
        S: Select<ByRef, Args, I>,
    {
        // SAFETY:
        // 1. Guaranteed by `Select`; signatures reachable by reference only
        //    borrow the payload.
        // 2. The selected signature only needs a shared reference.
        unsafe { self.invoke(S::INDEX, args) }
    }

    /// Invokes the signature selected by `Args` through a mutable reference.
    ///
    /// Returns `None` if the function is empty.
    #[inline]
    pub fn call_mut<Args, I>(
        &mut self,
        args: Args,
    ) -> Option<<S as Select<ByMut, Args, I>>::Output>
    where
        S: Select<ByMut, Args, I>,
    {
        // SAFETY:
        // 1. Guaranteed by `Select`; signatures reachable by mutable reference
        //    never move the payload out.
        // 2. We have exclusive access to `self`.
        unsafe { self.invoke(S::INDEX, args) }
    }

    /// Invokes the signature selected by `Args` through a mutable path while
    /// only holding a shared reference.
    ///
    /// Returns `None` if the function is empty.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. No other call of the function, and no reference obtained from
    ///    [`RawFunction::target`], is alive for the duration of the call. In
    ///    particular the payload must not call the function it is stored in.
    #[inline]
    pub unsafe fn call_const_unchecked<Args, I>(
        &self,
        args: Args,
    ) -> Option<<S as Select<ByMut, Args, I>>::Output>
    where
        S: Select<ByMut, Args, I>,
    {
        // SAFETY:
        // 1. Guaranteed by `Select`, as in `call_mut`.
        // 2. Guaranteed by the caller (1). The slot is an `UnsafeCell`, so
        //    mutating through a pointer derived from `&self` is allowed.
        unsafe { self.invoke(S::INDEX, args) }
    }

    /// Invokes the signature selected by `Args` by value, consuming the
    /// function.
    ///
    /// Returns `None` if the function is empty. If the selected signature
    /// borrows its payload, the payload is dropped after the call.
    pub fn call_once<Args, I>(self, args: Args) -> Option<<S as Select<ByValue, Args, I>>::Output>
    where
        S: Select<ByValue, Args, I>,
    {
        if !S::CONSUMES {
            // SAFETY:
            // 1. The selected signature does not move the payload out.
            // 2. We own `self`.
            return unsafe { self.invoke(S::INDEX, args) };
        }

        let this = ManuallyDrop::new(self);
        // An empty function owns nothing, so skipping its drop leaks nothing.
        let payload = this.payload()?;

        let _release = ReleaseOnDrop {
            vtable: this.vtable,
            slot: this.slot(),
        };

        // SAFETY: The function is not empty, so `INDEX` is in bounds and the
        // entry takes `Args` (guaranteed by `Select` and invariant 1).
        let entry = unsafe {
            this.vtable
                .entry::<Args, <S as Select<ByValue, Args, I>>::Output>(S::INDEX)
        };

        // SAFETY: The entry moves the payload out. `this` is never dropped,
        // and `_release` frees the rest of the erasure afterwards.
        Some(unsafe { entry(payload, args) })
    }
}

impl<S: ?Sized> Drop for RawFunction<S> {
    fn drop(&mut self) {
        // SAFETY: The slot holds the erasure of `self.vtable` (invariant 1),
        // and is never used again.
        unsafe {
            self.vtable.drop(self.slot());
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String, vec::Vec};
    use core::cell::Cell;

    use super::*;
    use crate::{DeepClone, NoClone};

    #[test]
    fn test_raw_function_send_sync() {
        static_assertions::assert_not_impl_any!(RawFunction<dyn Fn()>: Send, Sync);
        static_assertions::assert_not_impl_any!(RawFunction<dyn FnOnce(u8) -> u8>: Send, Sync);
        static_assertions::assert_not_impl_any!(RawFunction<dyn Fn()>: Clone);
    }

    #[test]
    fn test_raw_function_size() {
        assert_eq!(
            size_of::<RawFunction<dyn Fn()>>(),
            size_of::<usize>() + size_of::<Slot>()
        );
    }

    #[test]
    fn test_empty() {
        let function = RawFunction::<dyn Fn(i32) -> i32>::empty();
        assert!(function.is_empty());
        assert_eq!(function.type_id(), None);
        assert_eq!(function.type_name(), None);
        assert_eq!(function.call_ref((1,)), None);
        assert_eq!(function.call_once((1,)), None);
    }

    #[test]
    fn test_inline_and_allocated() {
        let small = RawFunction::<dyn Fn(u64) -> u64>::new::<_, DeepClone>(|x: u64| x + 1);
        assert_eq!(small.call_ref((1,)), Some(2));

        let values = [1_u64, 2, 3, 4, 5, 6, 7, 8];
        let large = RawFunction::<dyn Fn(u64) -> u64>::new::<_, DeepClone>(move |x: u64| {
            values.iter().sum::<u64>() + x
        });
        assert_eq!(large.call_ref((4,)), Some(40));

        // SAFETY: Created with `DeepClone`.
        let cloned = unsafe { large.clone_unchecked() };
        drop(large);
        assert_eq!(cloned.call_ref((0,)), Some(36));
    }

    #[test]
    fn test_target() {
        fn add(a: i32, b: i32) -> i32 {
            a + b
        }

        let mut function = RawFunction::<dyn Fn(i32, i32) -> i32>::from_ptr::<_, DeepClone>(Some(
            add as fn(i32, i32) -> i32,
        ));
        assert_eq!(function.call_ref((2, 3)), Some(5));
        assert_eq!(function.type_id(), Some(TypeId::of::<fn(i32, i32) -> i32>()));
        assert!(function.target::<fn(i32, i32) -> i32>().is_some());
        assert!(function.target::<i32>().is_none());
        assert!(function.target_mut::<fn(i32, i32) -> i32>().is_some());

        let none = RawFunction::<dyn Fn(i32, i32) -> i32>::from_ptr::<fn(i32, i32) -> i32, DeepClone>(
            None,
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_call_mut_and_const_fallback() {
        let mut count = 0_u32;
        let mut function = RawFunction::<dyn FnMut() -> u32>::new::<_, NoClone>(move || {
            count += 1;
            count
        });
        assert_eq!(function.call_mut(()), Some(1));
        // SAFETY: No other call is in progress.
        assert_eq!(unsafe { function.call_const_unchecked(()) }, Some(2));
        assert_eq!(function.call_mut(()), Some(3));
    }

    #[test]
    fn test_call_once_consumes() {
        let dropped = Rc::new(Cell::new(0));

        struct Tracker(Rc<Cell<u32>>, Vec<u64>);
        impl Drop for Tracker {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let tracker = Tracker(dropped.clone(), Vec::from([1, 2, 3]));
        let function = RawFunction::<dyn FnOnce() -> usize>::new::<_, NoClone>(move || {
            let tracker = tracker;
            tracker.1.len()
        });
        assert_eq!(function.call_once(()), Some(3));
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn test_call_once_on_borrowing_signature_drops_payload() {
        let dropped = Rc::new(Cell::new(false));

        struct Flag(Rc<Cell<bool>>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let flag = Flag(dropped.clone());
        let function = RawFunction::<dyn Fn() -> String>::new::<_, NoClone>(move || {
            let _ = &flag;
            String::from("called")
        });
        assert_eq!(function.call_once(()).as_deref(), Some("called"));
        assert!(dropped.get());
    }
}
