use alloc::alloc::handle_alloc_error;
use core::{alloc::Layout, any::TypeId, fmt, mem};

use allocator_api2::alloc::{AllocError, Allocator};
use polyfn_internals::{Callable, RawFunction, SignatureSet};

use crate::markers::{Cloneable, ObjectMarkerFor, OwnershipMarkerFor, SendSync, Unique};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use polyfn_internals::RawFunction;

    use crate::markers::{Cloneable, SendSync};

    /// A type-erased callable implementing every signature of `S`.
    ///
    /// # Type Parameters
    ///
    /// - **Signatures (`S`)**: Either a single signature such as
    ///   `dyn Fn(i32) -> i32`, or a tuple of [`Sig`] wrappers such as
    ///   `(Sig<dyn Fn(i32) -> i32>, Sig<dyn FnMut(&'static str)>)`
    /// - **Ownership (`O`)**: Controls whether the function can be cloned
    ///   - [`Cloneable`]: Implements `Clone`, only accepts `Clone` callables
    ///     (default)
    ///   - [`Unique`]: Cannot be cloned, accepts any callable
    /// - **Thread Safety (`T`)**: Controls whether the function can be sent
    ///   across threads
    ///   - [`SendSync`]: Can be sent across threads (default, requires the
    ///     callable and its allocator to be [`Send`]+[`Sync`])
    ///   - [`Local`]: Cannot be sent across threads
    ///
    /// # Storage
    ///
    /// Callables of at most [`INLINE_CAPACITY`] bytes whose alignment does
    /// not exceed that of a pointer are stored inline and never allocate.
    /// Larger callables are moved into a block from the global allocator, or
    /// from the allocator given to [`Function::new_in`].
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// let add: Function<dyn Fn(i32, i32) -> i32> = Function::new(|a: i32, b: i32| a + b);
    /// assert_eq!(add.call((2, 3)), Ok(5));
    ///
    /// let empty: Function<dyn Fn(i32, i32) -> i32> = Function::empty();
    /// assert!(empty.call((2, 3)).is_err());
    /// ```
    ///
    /// [`Sig`]: crate::Sig
    /// [`Unique`]: crate::markers::Unique
    /// [`Local`]: crate::markers::Local
    /// [`INLINE_CAPACITY`]: crate::INLINE_CAPACITY
    /// [`Function::new_in`]: crate::Function::new_in
    #[repr(transparent)]
    pub struct Function<S: ?Sized, Ownership: 'static = Cloneable, ThreadSafety: 'static = SendSync>
    {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. `O` must either be `Cloneable` or `Unique`.
        /// 2. `T` must either be `SendSync` or `Local`.
        /// 3. If `O = Cloneable`: The raw function is empty or was created
        ///    with the `DeepClone` mode.
        /// 4. If `T = SendSync`: The callable and the allocator holding it are
        ///    `Send+Sync`.
        raw: RawFunction<S>,
        _ownership: PhantomData<Ownership>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<S: ?Sized, O, T> Function<S, O, T> {
        /// Creates a new [`Function`] from a [`RawFunction`]
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `O` must either be `Cloneable` or `Unique`.
        /// 2. `T` must either be `SendSync` or `Local`.
        /// 3. If `O = Cloneable`: The raw function is empty or was created
        ///    with the `DeepClone` mode.
        /// 4. If `T = SendSync`: The callable and the allocator holding it are
        ///    `Send+Sync`.
        #[must_use]
        pub(crate) const unsafe fn from_raw(raw: RawFunction<S>) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Guaranteed by the caller
            // 2. Guaranteed by the caller
            // 3. Guaranteed by the caller
            // 4. Guaranteed by the caller
            Self {
                raw,
                _ownership: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        /// Consumes the [`Function`] and returns the inner [`RawFunction`].
        #[must_use]
        pub(crate) fn into_raw(self) -> RawFunction<S> {
            // SAFETY: We are destroying `self`, so we no longer
            // need to uphold any safety invariants.
            self.raw
        }

        /// Returns a reference to the inner [`RawFunction`].
        #[must_use]
        pub(crate) fn as_raw(&self) -> &RawFunction<S> {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Upheld as the type parameters do not change.
            // 2. Upheld as the type parameters do not change.
            // 3. Trivially upheld, as no mutation occurs
            // 4. Trivially upheld, as no mutation occurs
            &self.raw
        }

        /// Returns a mutable reference to the inner [`RawFunction`].
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. The raw function is not replaced through this reference. Calls
        ///    and mutation of the callable itself are fine.
        #[must_use]
        pub(crate) unsafe fn as_raw_mut(&mut self) -> &mut RawFunction<S> {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Upheld as the type parameters do not change.
            // 2. Upheld as the type parameters do not change.
            // 3. The caller guarantees that the raw function is not replaced,
            //    so its clone mode stays the same.
            // 4. The caller guarantees that the raw function is not replaced,
            //    and the type of the callable cannot change otherwise.
            &mut self.raw
        }
    }
}

pub use limit_field_access::Function;

/// A [`Function`] that cannot be cloned, and therefore accepts any callable.
///
/// # Examples
///
/// ```
/// use polyfn::UniqueFunction;
///
/// let names = vec![String::from("a"), String::from("b")];
/// let join: UniqueFunction<dyn FnOnce(&'static str) -> String> =
///     UniqueFunction::new(move |separator: &'static str| names.join(separator));
/// assert_eq!(join.call_once(("-",)).as_deref(), Ok("a-b"));
/// ```
pub type UniqueFunction<S, T = SendSync> = Function<S, Unique, T>;

/// Token for an empty [`Function`].
///
/// A function compares equal to `Empty` exactly when it holds no callable,
/// and converting `Empty` into a function gives an empty function.
///
/// # Examples
///
/// ```
/// use polyfn::{Empty, Function};
///
/// let mut double: Function<dyn Fn(u8) -> u8> = Empty.into();
/// assert!(double == Empty);
///
/// double.set(|x: u8| x * 2);
/// assert!(double != Empty);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Empty;

/// Records where a callable is about to be stored.
#[inline]
fn log_store<P>() {
    #[cfg(feature = "tracing")]
    tracing::trace!(
        callable = core::any::type_name::<P>(),
        inline = polyfn_internals::fits_inline::<P>(),
        "storing callable"
    );
}

impl<S: ?Sized, O, T> Function<S, O, T> {
    /// Creates a function holding no callable.
    ///
    /// Calling an empty function returns
    /// [`BadFunctionCall`](crate::BadFunctionCall).
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// static NOTHING: Function<dyn Fn()> = Function::empty();
    /// assert!(NOTHING.is_empty());
    /// ```
    #[must_use]
    pub const fn empty() -> Self {
        // SAFETY:
        // 1. Upheld by the marker types used throughout this crate.
        // 2. Upheld by the marker types used throughout this crate.
        // 3. The raw function is empty.
        // 4. The raw function is empty.
        unsafe { Self::from_raw(RawFunction::empty()) }
    }

    /// Creates a function holding `payload`.
    ///
    /// The payload is stored inline when it fits, and in a block of the
    /// global allocator otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::{Function, markers::{Local, Unique}};
    ///
    /// let greeting = String::from("hi ");
    /// let greet: Function<dyn Fn(&'static str) -> String> =
    ///     Function::new(move |name: &'static str| greeting.clone() + name);
    /// assert_eq!(greet.call(("bob",)).as_deref(), Ok("hi bob"));
    /// ```
    #[must_use]
    pub fn new<P>(payload: P) -> Self
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
    {
        log_store::<P>();
        let raw = <P as OwnershipMarkerFor<O>>::into_raw::<S>(payload);

        // SAFETY:
        // 1. Upheld by the marker types used throughout this crate.
        // 2. Upheld by the marker types used throughout this crate.
        // 3. `OwnershipMarkerFor<Cloneable>` creates raw functions with the
        //    `DeepClone` mode.
        // 4. `P: ObjectMarkerFor<SendSync>` implies `P: Send + Sync`, and the
        //    global allocator is `Send + Sync`.
        unsafe { Self::from_raw(raw) }
    }

    /// Creates a function holding `payload`, allocating from `alloc` if the
    /// payload does not fit inline.
    ///
    /// Payloads that fit inline never allocate, and `alloc` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if `alloc` fails to provide the block. The
    /// payload is dropped in that case.
    pub fn try_new_in<P, A>(payload: P, alloc: A) -> Result<Self, AllocError>
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
        A: Allocator + Clone + ObjectMarkerFor<T>,
    {
        log_store::<P>();
        let raw = <P as OwnershipMarkerFor<O>>::try_into_raw_in::<S, A>(payload, alloc)?;

        // SAFETY:
        // 1. Upheld by the marker types used throughout this crate.
        // 2. Upheld by the marker types used throughout this crate.
        // 3. `OwnershipMarkerFor<Cloneable>` creates raw functions with the
        //    `DeepClone` mode.
        // 4. `P: ObjectMarkerFor<SendSync>` and `A: ObjectMarkerFor<SendSync>`
        //    imply that both are `Send + Sync`.
        Ok(unsafe { Self::from_raw(raw) })
    }

    /// Like [`Function::try_new_in`], but calls
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::{Function, Global};
    ///
    /// let table = [1_u64; 16];
    /// let sum: Function<dyn Fn() -> u64> = Function::new_in(move || table.iter().sum::<u64>(), Global);
    /// assert_eq!(sum.call(()), Ok(16));
    /// ```
    #[must_use]
    pub fn new_in<P, A>(payload: P, alloc: A) -> Self
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
        A: Allocator + Clone + ObjectMarkerFor<T>,
    {
        match Self::try_new_in(payload, alloc) {
            Ok(function) => function,
            Err(AllocError) => handle_alloc_error(Layout::new::<P>()),
        }
    }

    /// Creates a function holding the callable produced by `make`.
    ///
    /// If `make` panics, nothing is stored and the panic propagates.
    #[must_use]
    pub fn new_with<P, F>(make: F) -> Self
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
        F: FnOnce() -> P,
    {
        Self::new(make())
    }

    /// Creates a function holding a pointer-like callable, such as a function
    /// pointer, or an empty function if `ptr` is `None`.
    ///
    /// The pointer is always stored inline. Pointer-like types that do not fit
    /// the inline slot fail to compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// fn negate(x: i64) -> i64 {
    ///     -x
    /// }
    ///
    /// let some: Function<dyn Fn(i64) -> i64> = Function::from_ptr(Some(negate as fn(i64) -> i64));
    /// assert_eq!(some.call((4,)), Ok(-4));
    ///
    /// let none: Function<dyn Fn(i64) -> i64> = Function::from_ptr(None::<fn(i64) -> i64>);
    /// assert!(none.is_empty());
    /// ```
    #[must_use]
    pub fn from_ptr<P>(ptr: Option<P>) -> Self
    where
        S: SignatureSet,
        P: Callable<S> + Copy + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
    {
        if ptr.is_some() {
            log_store::<P>();
        }
        let raw = <P as OwnershipMarkerFor<O>>::ptr_into_raw::<S>(ptr);

        // SAFETY:
        // 1. Upheld by the marker types used throughout this crate.
        // 2. Upheld by the marker types used throughout this crate.
        // 3. `OwnershipMarkerFor<Cloneable>` creates raw functions with the
        //    `DeepClone` mode.
        // 4. `P: ObjectMarkerFor<SendSync>` implies `P: Send + Sync`, and
        //    pointers are stored without an allocator.
        unsafe { Self::from_raw(raw) }
    }

    /// Replaces the callable with `payload`.
    ///
    /// The previous callable is dropped before `payload` is stored.
    pub fn set<P>(&mut self, payload: P)
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
    {
        self.clear();
        *self = Self::new(payload);
    }

    /// Replaces the callable with `payload`, allocating from `alloc` if
    /// needed.
    pub fn set_in<P, A>(&mut self, payload: P, alloc: A)
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
        A: Allocator + Clone + ObjectMarkerFor<T>,
    {
        self.clear();
        *self = Self::new_in(payload, alloc);
    }

    /// Replaces the callable with `payload`, allocating from `alloc` if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the allocation fails. The function is left
    /// empty in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::{Function, Global};
    ///
    /// let mut function: Function<dyn Fn() -> u8> = Function::new(|| 1_u8);
    /// function.try_set_in(|| 2_u8, Global).unwrap();
    /// assert_eq!(function.call(()), Ok(2));
    /// ```
    pub fn try_set_in<P, A>(&mut self, payload: P, alloc: A) -> Result<(), AllocError>
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
        A: Allocator + Clone + ObjectMarkerFor<T>,
    {
        self.clear();
        *self = Self::try_new_in(payload, alloc)?;
        Ok(())
    }

    /// Replaces the callable with the one produced by `make`.
    ///
    /// The previous callable is dropped before `make` runs. If `make` panics,
    /// the function is left empty.
    pub fn set_with<P, F>(&mut self, make: F)
    where
        S: SignatureSet,
        P: Callable<S> + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
        F: FnOnce() -> P,
    {
        self.clear();
        *self = Self::new(make());
    }

    /// Replaces the callable with a pointer-like callable, or clears the
    /// function if `ptr` is `None`.
    pub fn set_ptr<P>(&mut self, ptr: Option<P>)
    where
        S: SignatureSet,
        P: Callable<S> + Copy + OwnershipMarkerFor<O> + ObjectMarkerFor<T>,
    {
        self.clear();
        *self = Self::from_ptr(ptr);
    }

    /// Drops the callable, leaving the function empty.
    pub fn clear(&mut self) {
        drop(self.take());
    }

    /// Moves the callable out into a new function, leaving `self` empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// let mut source: Function<dyn Fn() -> i32> = Function::new(|| 7);
    /// let moved = source.take();
    /// assert!(source.is_empty());
    /// assert_eq!(moved.call(()), Ok(7));
    /// ```
    #[must_use = "the taken callable is dropped immediately; use `clear` for that"]
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::empty())
    }

    /// Exchanges the callables of two functions.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns whether the function holds no callable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_raw().is_empty()
    }

    /// Returns whether the function holds a callable.
    #[must_use]
    pub fn is_some(&self) -> bool {
        !self.is_empty()
    }

    /// Gets the [`TypeId`] of the stored callable, or `None` if the function
    /// is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::any::TypeId;
    ///
    /// use polyfn::Function;
    ///
    /// let function: Function<dyn Fn() -> u32> = Function::from_ptr(Some(u32::default as fn() -> u32));
    /// assert_eq!(function.target_type(), Some(TypeId::of::<fn() -> u32>()));
    /// assert_eq!(Function::<dyn Fn() -> u32>::empty().target_type(), None);
    /// ```
    #[must_use]
    pub fn target_type(&self) -> Option<TypeId> {
        self.as_raw().type_id()
    }

    /// Gets the type name of the stored callable, or `None` if the function
    /// is empty.
    #[must_use]
    pub fn target_type_name(&self) -> Option<&'static str> {
        self.as_raw().type_name()
    }

    /// Returns a reference to the stored callable if it has type `P`.
    #[must_use]
    pub fn target<P: 'static>(&self) -> Option<&P> {
        self.as_raw().target::<P>()
    }

    /// Returns a mutable reference to the stored callable if it has type
    /// `P`.
    #[must_use]
    pub fn target_mut<P: 'static>(&mut self) -> Option<&mut P> {
        // SAFETY:
        // 1. The raw function is not replaced, only its callable is borrowed.
        let raw = unsafe { self.as_raw_mut() };
        raw.target_mut::<P>()
    }
}

impl<S: ?Sized, T> Clone for Function<S, Cloneable, T> {
    /// Clones the stored callable with its own `Clone` implementation.
    ///
    /// If that implementation panics, nothing is leaked and `self` keeps its
    /// callable.
    fn clone(&self) -> Self {
        // SAFETY:
        // 1. The function is empty or was created with the `DeepClone` mode,
        //    since `O = Cloneable`.
        let raw = unsafe { self.as_raw().clone_unchecked() };

        // SAFETY:
        // 1. `O = Cloneable`.
        // 2. Upheld by the marker types used throughout this crate.
        // 3. The clone has the same vtable as `self`.
        // 4. The clone has the same callable and allocator types as `self`.
        unsafe { Self::from_raw(raw) }
    }
}

impl<S: ?Sized, O, T> Default for Function<S, O, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: ?Sized, O, T> fmt::Debug for Function<S, O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Function");
        match self.target_type_name() {
            Some(name) => debug.field("target", &name),
            None => debug.field("target", &Empty),
        };
        debug.finish()
    }
}

impl<S: ?Sized, O, T> From<Empty> for Function<S, O, T> {
    fn from(Empty: Empty) -> Self {
        Self::empty()
    }
}

impl<S: ?Sized, O, T> PartialEq<Empty> for Function<S, O, T> {
    fn eq(&self, Empty: &Empty) -> bool {
        self.is_empty()
    }
}

impl<S: ?Sized, O, T> PartialEq<Function<S, O, T>> for Empty {
    fn eq(&self, function: &Function<S, O, T>) -> bool {
        function.is_empty()
    }
}

// SAFETY: The callable and the allocator of a `Function<S, O, SendSync>` are
// `Send+Sync` (safety invariant 4), so the function can move between threads.
unsafe impl<S: ?Sized, O> Send for Function<S, O, SendSync> {}

// SAFETY: The callable and the allocator of a `Function<S, O, SendSync>` are
// `Send+Sync` (safety invariant 4). Calls through a shared reference only
// reach the callable by shared reference, apart from the unsafe
// `call_const_unchecked` whose caller excludes concurrent calls.
unsafe impl<S: ?Sized, O> Sync for Function<S, O, SendSync> {}
