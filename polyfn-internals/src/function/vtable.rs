//! Vtable for type-erased function operations.
//!
//! This module encapsulates the fields of [`FunctionVtable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the function pointers of a vtable match the erasure stored in
//! the slot it is paired with**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via [`FunctionVtable::new`], which pairs the function pointers
//! with a specific erasure `E` at compile time, or via
//! [`FunctionVtable::empty`], which owns nothing.

use core::{
    any::{TypeId, type_name},
    ptr::NonNull,
};

use crate::{
    erasure::{Empty, Erasure, Slot},
    signature::{Callable, EntryFn, ErasedEntry, SignatureSet},
    util::Erased,
};

/// Clones the erasure in the first slot into the second, uninitialized slot.
pub type CloneFn = unsafe fn(NonNull<Slot>, NonNull<Slot>);

/// Vtable for type-erased function operations.
///
/// Contains function pointers for managing and invoking the content of a slot
/// without knowing its concrete type at compile time.
///
/// # Safety Invariant
///
/// The fields `drop`, `release`, `clone`, `target` and `entries` are
/// guaranteed to point to the functions defined below (or generated by the
/// signature impls) instantiated with the erasure type `E` that was used to
/// create this [`FunctionVtable`]. For the vtable returned by
/// [`FunctionVtable::empty`], they are no-ops and `entries` is empty.
pub(crate) struct FunctionVtable {
    /// Gets the [`TypeId`] of the payload.
    type_id: fn() -> TypeId,
    /// Gets the type name of the payload.
    type_name: fn() -> &'static str,
    /// Drops the erasure stored in the slot.
    drop: unsafe fn(NonNull<Slot>),
    /// Frees the erasure stored in the slot after its payload was moved out.
    release: unsafe fn(NonNull<Slot>),
    /// Clones the erasure into another slot, if the clone mode allows it.
    clone: Option<CloneFn>,
    /// Gets a pointer to the payload, or `None` for an empty function.
    target: unsafe fn(NonNull<Slot>) -> Option<NonNull<Erased>>,
    /// One invocation entry per signature of the set.
    entries: &'static [ErasedEntry],
}

impl FunctionVtable {
    /// Creates a new [`FunctionVtable`] for the erasure `E` of a function with
    /// the signature set `S`, cloned according to `K`.
    pub(crate) const fn new<S, E, K>() -> &'static Self
    where
        S: SignatureSet + ?Sized,
        E: Erasure,
        E::Payload: Callable<S>,
        K: Cloning<E>,
    {
        const {
            assert!(
                <E::Payload as Callable<S>>::ENTRIES.len() == S::LEN,
                "one invocation entry is required per signature"
            );
            &Self {
                type_id: TypeId::of::<E::Payload>,
                type_name: type_name::<E::Payload>,
                drop: drop::<E>,
                release: release::<E>,
                clone: K::CLONE,
                target: target::<E>,
                entries: <E::Payload as Callable<S>>::ENTRIES,
            }
        }
    }

    /// Returns the vtable of an empty function.
    pub(crate) const fn empty() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<Empty>,
                type_name: type_name::<Empty>,
                drop: noop,
                release: noop,
                clone: Some(noop_clone),
                target: no_target,
                entries: &[],
            }
        }
    }

    /// Gets the [`TypeId`] of the payload, or of a private marker if the
    /// function is empty.
    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the type name of the payload.
    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Returns whether this is the vtable of an empty function.
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.type_id() == TypeId::of::<Empty>()
    }

    /// Drops the erasure stored in `slot`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds an initialized erasure of the type this vtable was
    ///    created for.
    /// 2. The slot is considered uninitialized after this call.
    #[inline]
    pub(crate) unsafe fn drop(&self, slot: NonNull<Slot>) {
        // SAFETY: Guaranteed by the caller (1 and 2).
        unsafe { (self.drop)(slot) }
    }

    /// Frees the erasure stored in `slot` without dropping its payload.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds an initialized erasure of the type this vtable was
    ///    created for.
    /// 2. The payload has been moved out.
    /// 3. The slot is considered uninitialized after this call.
    #[inline]
    pub(crate) unsafe fn release(&self, slot: NonNull<Slot>) {
        // SAFETY: Guaranteed by the caller (1, 2 and 3).
        unsafe { (self.release)(slot) }
    }

    /// Clones the erasure in `source` into `destination`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `source` holds an initialized erasure of the type this vtable was
    ///    created for.
    /// 2. `destination` is valid for writes and holds nothing that needs
    ///    dropping.
    /// 3. This vtable was created with [`DeepClone`], or is the vtable of an
    ///    empty function.
    #[inline]
    pub(crate) unsafe fn clone(&self, source: NonNull<Slot>, destination: NonNull<Slot>) {
        // SAFETY: The clone entry is present (guaranteed by the caller (3)).
        let clone: CloneFn = unsafe { self.clone.unwrap_unchecked() };
        // SAFETY: Guaranteed by the caller (1 and 2).
        unsafe { clone(source, destination) }
    }

    /// Gets a pointer to the payload of the erasure stored in `slot`.
    ///
    /// Returns `None` for an empty function.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` holds an initialized erasure of the type this vtable was
    ///    created for.
    #[inline]
    pub(crate) unsafe fn target(&self, slot: NonNull<Slot>) -> Option<NonNull<Erased>> {
        // SAFETY: Guaranteed by the caller (1).
        unsafe { (self.target)(slot) }
    }

    /// Gets the invocation entry at `index`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `index` is smaller than the number of signatures of the set this
    ///    vtable was created for, and this is not the vtable of an empty
    ///    function.
    /// 2. The signature at `index` takes `Args` and returns `R`.
    #[inline]
    pub(crate) unsafe fn entry<Args, R>(&self, index: usize) -> EntryFn<Args, R> {
        // SAFETY: `index` is in bounds (guaranteed by the caller (1)).
        let entry: ErasedEntry = unsafe { *self.entries.get_unchecked(index) };
        // SAFETY: The entry was erased from an `EntryFn<Args, R>` (guaranteed
        // by the caller (2) and by the safety contract of `Callable`).
        unsafe { core::mem::transmute::<ErasedEntry, EntryFn<Args, R>>(entry) }
    }
}

/// Implementation of [`FunctionVtable::drop`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` holds an initialized `E`.
/// 2. The slot is considered uninitialized after this call.
unsafe fn drop<E: Erasure>(slot: NonNull<Slot>) {
    // SAFETY: Guaranteed by the caller (1 and 2).
    unsafe { slot.cast::<E>().drop_in_place() }
}

/// Implementation of [`FunctionVtable::release`].
///
/// # Safety
///
/// The caller must ensure the requirements of [`Erasure::release`].
unsafe fn release<E: Erasure>(slot: NonNull<Slot>) {
    // SAFETY: Guaranteed by the caller.
    unsafe { E::release(slot) }
}

/// Implementation of [`FunctionVtable::clone`] for cloneable erasures.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `source` holds an initialized `E`.
/// 2. `destination` is valid for writes of an `E`.
unsafe fn clone<E: Erasure + Clone>(source: NonNull<Slot>, destination: NonNull<Slot>) {
    // SAFETY: Guaranteed by the caller (1).
    let source: &E = unsafe { source.cast::<E>().as_ref() };
    let cloned = source.clone();
    // SAFETY: Guaranteed by the caller (2). `E` fits the slot, as required of
    // every erasure.
    unsafe { destination.cast::<E>().write(cloned) }
}

/// Implementation of [`FunctionVtable::target`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` holds an initialized `E`.
unsafe fn target<E: Erasure>(slot: NonNull<Slot>) -> Option<NonNull<Erased>> {
    // SAFETY: Guaranteed by the caller (1).
    let payload = unsafe { E::payload(slot) };
    Some(payload.cast::<Erased>())
}

/// Drop and release of an empty function.
///
/// # Safety
///
/// Always safe to call. It is `unsafe` only to fit the vtable fields.
unsafe fn noop(_slot: NonNull<Slot>) {}

/// Clone of an empty function.
///
/// # Safety
///
/// Always safe to call. It is `unsafe` only to fit the vtable field.
unsafe fn noop_clone(_source: NonNull<Slot>, _destination: NonNull<Slot>) {}

/// Target of an empty function.
///
/// # Safety
///
/// Always safe to call. It is `unsafe` only to fit the vtable field.
unsafe fn no_target(_slot: NonNull<Slot>) -> Option<NonNull<Erased>> {
    None
}

/// How the erasure `E` is cloned when its function is cloned.
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. `CLONE` is `None`, or clones an initialized `E` in its first slot into
///    its second slot.
pub unsafe trait Cloning<E: Erasure>: 'static {
    /// The clone entry stored in the vtable.
    const CLONE: Option<CloneFn>;
}

/// Clone mode of functions that cannot be cloned.
#[derive(Copy, Clone, Debug)]
pub struct NoClone;

/// Clone mode of functions that are cloned by cloning their erasure.
///
/// For an [`Allocated`](crate::Allocated) erasure this allocates a new block,
/// so clones never share their payload.
#[derive(Copy, Clone, Debug)]
pub struct DeepClone;

// SAFETY: `CLONE` is `None`.
unsafe impl<E: Erasure> Cloning<E> for NoClone {
    const CLONE: Option<CloneFn> = None;
}

// SAFETY: `clone::<E>` clones an `E` between slots.
unsafe impl<E: Erasure + Clone> Cloning<E> for DeepClone {
    const CLONE: Option<CloneFn> = Some(clone::<E>);
}
