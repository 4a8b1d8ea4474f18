//! Call signatures and the compile-time machinery that dispatches on them.
//!
//! A function type is parameterized over a *signature set*: either a single
//! signature written as a closure trait object (`dyn Fn(i32) -> i32`,
//! `dyn FnMut(&'static str)`, `dyn FnOnce() -> String`) or a tuple of
//! signatures wrapped in [`Sig`], such as
//! `(Sig<dyn Fn(i32) -> i32>, Sig<dyn FnMut(&'static str)>)`.
//!
//! The trait object is only used as a type-level name for the signature. It
//! is never instantiated; the payload is stored through an
//! [`Erasure`](crate::Erasure) and invoked through an *entry*: a function
//! pointer generated per payload type and per signature.
//!
//! # Entries
//!
//! For a payload `P` and a signature `S`, [`Implements<S>`] provides the entry
//! invoking `P` with the arguments of `S`. [`Callable<S>`] collects the entries
//! of every signature in a set, in declaration order, so that the
//! [`FunctionVtable`](crate::function::vtable::FunctionVtable) can store them
//! as one slice.
//!
//! # Selection
//!
//! [`Select<Path, Args, Index>`] picks the signature a call resolves to. The
//! argument tuple `Args` is matched against every signature of the set, and
//! `Index` is inferred by the compiler from the only match. The access path
//! `Path` ([`ByRef`], [`ByMut`] or [`ByValue`]) filters out signatures whose
//! receiver is not reachable through it:
//!
//! | Access path | Reaches                    |
//! |-------------|----------------------------|
//! | [`ByRef`]   | `Fn`                       |
//! | [`ByMut`]   | `Fn`, `FnMut`              |
//! | [`ByValue`] | `Fn`, `FnMut`, `FnOnce`    |
//!
//! Signatures whose argument types contain a non-`'static` lifetime are not
//! supported, since `dyn Fn(&str)` is a higher-ranked type that no single
//! impl can name.

use core::{marker::PhantomData, ptr::NonNull};

use crate::util::Erased;

mod arity;
mod overload;
mod select;

pub use self::overload::{Overload, OverloadMut, Overloaded};

/// A type-erased invocation entry.
///
/// Every entry is really an [`EntryFn<Args, R>`] for the argument tuple and
/// output of the signature it was generated for. It must be turned back into
/// that type before being called.
pub type ErasedEntry = unsafe fn();

/// The concrete type of an invocation entry.
///
/// The first argument points to the payload of the function. Whether the
/// entry reads it through a shared reference, a mutable reference, or moves it
/// out depends on the receiver of the signature.
pub(crate) type EntryFn<Args, R> = unsafe fn(NonNull<Erased>, Args) -> R;

/// Erases the type of an invocation entry.
#[inline]
pub(crate) const fn erase<Args, R>(entry: EntryFn<Args, R>) -> ErasedEntry {
    // SAFETY: Function pointers have the same size and representation
    // regardless of their signature. The result is only ever called after
    // being transmuted back to `EntryFn<Args, R>`.
    unsafe { core::mem::transmute::<EntryFn<Args, R>, ErasedEntry>(entry) }
}

/// Access path of a call through `&self`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct ByRef;

/// Access path of a call through `&mut self`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct ByMut;

/// Access path of a call through `self`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct ByValue;

/// One of [`ByRef`], [`ByMut`] and [`ByValue`].
pub trait AccessPath: 'static {
    /// Whether an entry with this receiver moves the payload out of the
    /// function.
    const CONSUMES: bool;
}

impl AccessPath for ByRef {
    const CONSUMES: bool = false;
}

impl AccessPath for ByMut {
    const CONSUMES: bool = false;
}

impl AccessPath for ByValue {
    const CONSUMES: bool = true;
}

/// Implemented by a receiver `Self` when signatures with that receiver can be
/// invoked through the access path `Path`.
pub trait ReachableThrough<Path: AccessPath>: AccessPath {}

impl ReachableThrough<ByRef> for ByRef {}
impl ReachableThrough<ByMut> for ByRef {}
impl ReachableThrough<ByValue> for ByRef {}
impl ReachableThrough<ByMut> for ByMut {}
impl ReachableThrough<ByValue> for ByMut {}
impl ReachableThrough<ByValue> for ByValue {}

/// A single call signature.
///
/// Implemented for `dyn Fn(A..) -> R`, `dyn FnMut(A..) -> R` and
/// `dyn FnOnce(A..) -> R` with up to eight arguments.
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. Every [`Implements<Self>`] entry is an [`EntryFn`] taking
///    `Self::Args` and returning `Self::Output`.
/// 2. Entries only reach the payload through the access given by
///    [`Self::Receiver`]: a shared reference for [`ByRef`], a mutable
///    reference for [`ByMut`], and a move for [`ByValue`].
pub unsafe trait Signature {
    /// The arguments of the signature, as a tuple.
    type Args;
    /// The return type of the signature.
    type Output;
    /// How the payload is accessed when invoked through this signature.
    type Receiver: AccessPath;
}

/// Wrapper naming one signature inside a tuple of signatures.
///
/// Tuples cannot hold unsized types, so `(dyn Fn(), dyn FnMut(i32))` is
/// written `(Sig<dyn Fn()>, Sig<dyn FnMut(i32)>)` instead.
pub struct Sig<S: ?Sized>(PhantomData<S>);

/// Index of a single signature, and of each element of a signature tuple.
#[derive(Copy, Clone, Debug)]
pub struct Here;

/// Index of the first signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N0;
/// Index of the second signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N1;
/// Index of the third signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N2;
/// Index of the fourth signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N3;
/// Index of the fifth signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N4;
/// Index of the sixth signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N5;
/// Index of the seventh signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N6;
/// Index of the eighth signature of a tuple.
#[derive(Copy, Clone, Debug)]
pub struct N7;

/// A set of signatures: a single [`Signature`] or a tuple of up to eight
/// [`Sig`]s.
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. `LEN` is the number of signatures in the set.
pub unsafe trait SignatureSet {
    /// Number of signatures in the set.
    const LEN: usize;
}

/// Implemented by payloads that can be invoked with the signature `S`.
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. `ENTRY` is an [`EntryFn`] taking the arguments and returning the output
///    of `S` that, given a pointer to a valid `Self`, invokes it with the
///    access required by the receiver of `S`.
pub unsafe trait Implements<S: ?Sized>: Sized + 'static {
    /// The type-erased invocation entry.
    const ENTRY: ErasedEntry;
}

/// Implemented by payloads that implement every signature of the set `S`.
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. `ENTRIES` holds one entry per signature of `S`, in declaration order,
///    each satisfying the requirements of [`Implements`].
pub unsafe trait Callable<S: ?Sized>: Sized + 'static {
    /// The invocation entries, one per signature.
    const ENTRIES: &'static [ErasedEntry];
}

/// Resolves a call with the arguments `Args` through the access path `Path`
/// to one signature of the set `Self`.
///
/// `Index` is [`Here`] for a single signature, and one of [`N0`] to [`N7`]
/// for a tuple of signatures. It is normally left for the compiler to infer.
/// A call is ambiguous when two signatures of a tuple accept the same
/// arguments through the same path, in which case the index has to be given
/// explicitly.
///
/// # Safety
///
/// Implementors must guarantee:
///
/// 1. The signature at position `INDEX` of the set accepts `Args` and returns
///    `Output`.
/// 2. Its receiver is reachable through `Path`.
/// 3. `CONSUMES` is `true` exactly when its entry moves the payload out.
#[diagnostic::on_unimplemented(
    message = "no signature of `{Self}` accepts `{Args}` through `{Path}`",
    label = "no matching signature",
    note = "`Fn` signatures are reachable through `&`, `FnMut` through `&mut` and `FnOnce` only by value",
    note = "if several signatures accept these arguments, name the index explicitly, e.g. `call_once::<(u32,), N1>(..)`"
)]
pub unsafe trait Select<Path: AccessPath, Args, Index> {
    /// The return type of the selected signature.
    type Output;
    /// Position of the selected signature in the set.
    const INDEX: usize;
    /// Whether invoking the selected entry moves the payload out.
    const CONSUMES: bool;
}

// SAFETY:
// 1. A single signature is the only element of its set.
// 2. Guaranteed by the `ReachableThrough` bound.
// 3. Entries of a signature move the payload out exactly when its receiver is
//    `ByValue` (guaranteed by `Signature`).
unsafe impl<S, Path> Select<Path, S::Args, Here> for S
where
    S: Signature + ?Sized,
    Path: AccessPath,
    S::Receiver: ReachableThrough<Path>,
{
    type Output = S::Output;

    const INDEX: usize = 0;
    const CONSUMES: bool = <S::Receiver as AccessPath>::CONSUMES;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of<S, Path, Args, I>() -> usize
    where
        S: Select<Path, Args, I> + ?Sized,
        Path: AccessPath,
    {
        S::INDEX
    }

    fn consumes<S, Path, Args, I>() -> bool
    where
        S: Select<Path, Args, I> + ?Sized,
        Path: AccessPath,
    {
        S::CONSUMES
    }

    #[test]
    fn test_single_signature_selection() {
        assert_eq!(index_of::<dyn Fn(i32) -> i32, ByRef, (i32,), _>(), 0);
        assert!(!consumes::<dyn Fn(i32) -> i32, ByValue, (i32,), _>());
        assert!(!consumes::<dyn FnMut() -> u8, ByMut, (), _>());
        assert!(consumes::<dyn FnOnce(u8, u16), ByValue, (u8, u16), _>());
    }

    #[test]
    fn test_tuple_selection_by_arguments() {
        type Set = (
            Sig<dyn Fn(i32) -> i32>,
            Sig<dyn FnMut(&'static str) -> usize>,
            Sig<dyn FnOnce() -> u8>,
        );

        assert_eq!(index_of::<Set, ByRef, (i32,), _>(), 0);
        assert_eq!(index_of::<Set, ByMut, (&'static str,), _>(), 1);
        assert_eq!(index_of::<Set, ByValue, (), _>(), 2);
        assert!(consumes::<Set, ByValue, (), _>());
        assert!(!consumes::<Set, ByValue, (&'static str,), _>());
    }

    #[test]
    fn test_signature_set_len() {
        assert_eq!(<dyn Fn() as SignatureSet>::LEN, 1);
        assert_eq!(<(Sig<dyn Fn()>,) as SignatureSet>::LEN, 1);
        assert_eq!(
            <(Sig<dyn Fn()>, Sig<dyn FnMut(i32)>, Sig<dyn FnOnce(u8)>) as SignatureSet>::LEN,
            3
        );
    }
}
