//! Marker types and traits for defining cloneability and thread-safety
//! semantics.
//!
//! These markers are used as generic parameters in
//! [`Function<S, O, T>`](crate::Function) to encode at compile time what can be
//! done with a function and which callables it accepts.
//!
//! # Design Philosophy
//!
//! The constraints encoded by these markers are enforced at construction time.
//! It is impossible to store a callable in a [`Function`](crate::Function) that
//! violates the invariants associated with its marker types. This means you can
//! trust that a `Function<_, _, SendSync>` truly is `Send + Sync`, and that a
//! `Function<_, Cloneable>` can always be cloned.
//!
//! # Ownership Markers
//!
//! The ownership marker `O` can be:
//! - [`Cloneable`]: The function implements `Clone`, and only accepts
//!   callables implementing `Clone` (default)
//! - [`Unique`]: The function cannot be cloned, and accepts any callable
//!
//! # Thread Safety Markers
//!
//! The thread safety marker `T` can be:
//!
//! - [`SendSync`]: The function and its callable are `Send + Sync` (default)
//! - [`Local`]: The function may hold non-thread-safe data and cannot cross
//!   thread boundaries
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use polyfn::{Function, UniqueFunction, markers};
//!
//! // Cloneable and thread-safe by default
//! let greet: Function<dyn Fn() -> String> = Function::new(|| String::from("hello"));
//! let copy = greet.clone();
//! std::thread::spawn(move || assert_eq!(copy.call(()).unwrap(), "hello"))
//!     .join()
//!     .unwrap();
//!
//! // A move-only payload needs `Unique`
//! let buffer = vec![1, 2, 3];
//! let take: UniqueFunction<dyn FnOnce() -> Vec<i32>> = UniqueFunction::new(move || buffer);
//!
//! // An `Rc` payload needs `Local`
//! let shared = Rc::new(5);
//! let local: Function<dyn Fn() -> i32, markers::Cloneable, markers::Local> =
//!     Function::new(move || *shared);
//! assert_eq!(local.call(()), Ok(5));
//! ```

use allocator_api2::alloc::{AllocError, Allocator};
use polyfn_internals::{Callable, DeepClone, NoClone, RawFunction, SignatureSet};

/// Marker type for functions that can be cloned.
///
/// A `Function<S, Cloneable, T>` implements [`Clone`]. Cloning copies the
/// callable with its own `Clone` implementation: a callable stored behind an
/// allocation gets a new allocation, so clones never share state.
///
/// Only callables implementing `Clone` can be stored in such a function.
///
/// # Examples
///
/// ```
/// use polyfn::{Function, markers::Cloneable};
///
/// let offset = 10;
/// let add: Function<dyn Fn(i32) -> i32, Cloneable> = Function::new(move |x: i32| x + offset);
/// let cloned = add.clone();
/// assert_eq!(cloned.call((1,)), Ok(11));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Cloneable;

/// Marker type for functions with unique ownership of their callable.
///
/// A `Function<S, Unique, T>` does not implement [`Clone`], which allows it to
/// store callables that cannot be cloned, such as closures capturing a
/// `Vec` by move and handing it out through a `dyn FnOnce` signature.
///
/// # Examples
///
/// ```
/// use polyfn::UniqueFunction;
///
/// struct Token;
///
/// let token = Token;
/// let consume: UniqueFunction<dyn FnOnce() -> Token> = UniqueFunction::new(move || token);
/// let _token: Token = consume.call_once(()).unwrap();
///
/// // Cannot clone - Unique functions don't implement Clone
/// // let cloned = consume.clone(); // Won't compile
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Unique;

/// Marker type indicating that a function and its callable are `Send + Sync`.
///
/// This is the default thread-safety marker. Only callables (and allocators)
/// that are `Send + Sync` can be stored in a `Function<_, _, SendSync>`.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use polyfn::{Function, markers::{Cloneable, SendSync}};
///
/// let double: Function<dyn Fn(u32) -> u32, Cloneable, SendSync> =
///     Function::new(|x: u32| x * 2);
///
/// thread::spawn(move || {
///     assert_eq!(double.call((21,)), Ok(42));
/// })
/// .join()
/// .unwrap();
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SendSync;

/// Marker type indicating that a function is not `Send` or `Sync`.
///
/// Use `Local` when the callable captures `Rc<T>`, `Cell<T>`, raw pointers or
/// anything else that is `!Send` or `!Sync`.
///
/// # Examples
///
/// ```
/// use std::{cell::Cell, rc::Rc};
///
/// use polyfn::{Function, markers::{Local, Unique}};
///
/// let counter = Rc::new(Cell::new(0));
/// let seen = counter.clone();
/// let bump: Function<dyn Fn(), Unique, Local> = Function::new(move || seen.set(seen.get() + 1));
///
/// bump.call(()).unwrap();
/// bump.call(()).unwrap();
/// assert_eq!(counter.get(), 2);
///
/// // This function cannot be sent to another thread
/// // std::thread::spawn(move || bump.call(())); // Won't compile
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

mod sealed_ownership_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Cloneable {}
    impl Sealed for Unique {}
}

mod sealed_thread_safety_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for SendSync {}
    impl Sealed for Local {}
}

/// Marker trait for the ownership semantics of a function.
///
/// This trait is implemented for [`Cloneable`] and [`Unique`]. It is sealed
/// and cannot be implemented outside of this crate.
pub trait OwnershipMarker: sealed_ownership_marker::Sealed {}

impl OwnershipMarker for Cloneable {}
impl OwnershipMarker for Unique {}

/// Marker trait for the thread-safety semantics of a function.
///
/// This trait is implemented for [`SendSync`] and [`Local`]. It is sealed and
/// cannot be implemented outside of this crate.
pub trait ThreadSafetyMarker: sealed_thread_safety_marker::Sealed {}

impl ThreadSafetyMarker for SendSync {}
impl ThreadSafetyMarker for Local {}

/// Marker trait combining a callable or allocator with a thread-safety
/// marker.
///
/// This trait is used to enforce thread-safety requirements at construction
/// time. It is automatically implemented for every `'static` type with
/// [`Local`], and for every `'static` type that is `Send + Sync` with
/// [`SendSync`].
///
/// When you store a callable in a `Function<_, _, T>`, the callable (and the
/// allocator, if any) must implement `ObjectMarkerFor<T>`.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
///
/// use polyfn::markers::{Local, ObjectMarkerFor, SendSync};
///
/// fn requires_sendsync<T: ObjectMarkerFor<SendSync>>() {}
/// fn requires_local<T: ObjectMarkerFor<Local>>() {}
///
/// requires_sendsync::<fn() -> u8>();
/// requires_local::<fn() -> u8>();
/// requires_local::<Rc<u8>>();
/// // requires_sendsync::<Rc<u8>>(); // Won't compile
/// ```
pub trait ObjectMarkerFor<T>: Sized + 'static {}

impl<P: Sized + 'static> ObjectMarkerFor<Local> for P {}

impl<P: Sized + 'static> ObjectMarkerFor<SendSync> for P where P: Send + Sync {}

/// Marker trait combining a callable with an ownership marker.
///
/// It is automatically implemented for every `'static` type with [`Unique`],
/// and for every `'static` type that is `Clone` with [`Cloneable`]. Its hidden
/// methods pick the clone mode of the function's vtable.
pub trait OwnershipMarkerFor<O>: Sized + 'static {
    /// Stores the callable in a new raw function.
    #[doc(hidden)]
    fn into_raw<S>(self) -> RawFunction<S>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S>;

    /// Stores the callable in a new raw function, allocating from `alloc` if
    /// the callable does not fit inline.
    #[doc(hidden)]
    fn try_into_raw_in<S, A>(self, alloc: A) -> Result<RawFunction<S>, AllocError>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S>,
        A: Allocator + Clone + 'static;

    /// Stores a pointer-like callable in a new raw function.
    #[doc(hidden)]
    fn ptr_into_raw<S>(ptr: Option<Self>) -> RawFunction<S>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S> + Copy;
}

impl<P: Clone + 'static> OwnershipMarkerFor<Cloneable> for P {
    #[inline]
    fn into_raw<S>(self) -> RawFunction<S>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S>,
    {
        RawFunction::new::<P, DeepClone>(self)
    }

    #[inline]
    fn try_into_raw_in<S, A>(self, alloc: A) -> Result<RawFunction<S>, AllocError>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S>,
        A: Allocator + Clone + 'static,
    {
        RawFunction::try_new_in::<P, A, DeepClone>(self, alloc)
    }

    #[inline]
    fn ptr_into_raw<S>(ptr: Option<Self>) -> RawFunction<S>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S> + Copy,
    {
        RawFunction::from_ptr::<P, DeepClone>(ptr)
    }
}

impl<P: 'static> OwnershipMarkerFor<Unique> for P {
    #[inline]
    fn into_raw<S>(self) -> RawFunction<S>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S>,
    {
        RawFunction::new::<P, NoClone>(self)
    }

    #[inline]
    fn try_into_raw_in<S, A>(self, alloc: A) -> Result<RawFunction<S>, AllocError>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S>,
        A: Allocator + Clone + 'static,
    {
        RawFunction::try_new_in::<P, A, NoClone>(self, alloc)
    }

    #[inline]
    fn ptr_into_raw<S>(ptr: Option<Self>) -> RawFunction<S>
    where
        S: SignatureSet + ?Sized,
        Self: Callable<S> + Copy,
    {
        RawFunction::from_ptr::<P, NoClone>(ptr)
    }
}
