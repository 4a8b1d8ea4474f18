//! Payloads with several call signatures.
//!
//! A closure has exactly one argument list, so a payload meant for a tuple of
//! signatures with different arguments has to be a user type. Such a type
//! implements [`Overload`] (or [`OverloadMut`]) once per argument tuple and is
//! wrapped in [`Overloaded`] when stored.

use core::ptr::NonNull;

use crate::util::Erased;

/// A callable accepting the argument tuple `Args` through a shared reference.
///
/// # Examples
///
/// ```
/// use polyfn_internals::Overload;
///
/// struct Describe;
///
/// impl Overload<(i32,)> for Describe {
///     type Output = &'static str;
///
///     fn call(&self, (_,): (i32,)) -> &'static str {
///         "integer"
///     }
/// }
///
/// impl Overload<(&'static str,)> for Describe {
///     type Output = &'static str;
///
///     fn call(&self, (_,): (&'static str,)) -> &'static str {
///         "string"
///     }
/// }
///
/// assert_eq!(Overload::<(i32,)>::call(&Describe, (1,)), "integer");
/// ```
pub trait Overload<Args> {
    /// The return type for these arguments.
    type Output;

    /// Invokes the callable.
    fn call(&self, args: Args) -> Self::Output;
}

/// A callable accepting the argument tuple `Args` through a mutable
/// reference.
///
/// Every [`Overload`] is also an `OverloadMut`.
pub trait OverloadMut<Args> {
    /// The return type for these arguments.
    type Output;

    /// Invokes the callable.
    fn call_mut(&mut self, args: Args) -> Self::Output;
}

impl<F, Args> OverloadMut<Args> for F
where
    F: Overload<Args>,
{
    type Output = <F as Overload<Args>>::Output;

    #[inline]
    fn call_mut(&mut self, args: Args) -> Self::Output {
        self.call(args)
    }
}

/// Wrapper storing an [`Overload`] callable in a function.
///
/// `Overloaded<F>` implements a `dyn Fn(A..) -> R` signature when
/// `F: Overload<(A..,), Output = R>`, and `dyn FnMut` and `dyn FnOnce`
/// signatures when `F: OverloadMut<(A..,), Output = R>`.
///
/// The stored callable has type `Overloaded<F>`, so target queries on a
/// function holding it match `Overloaded<F>` and never `F` itself.
///
/// ```
/// use polyfn_internals::{DeepClone, Overload, Overloaded, RawFunction};
///
/// #[derive(Clone)]
/// struct Seven;
///
/// impl Overload<()> for Seven {
///     type Output = u8;
///     fn call(&self, (): ()) -> u8 {
///         7
///     }
/// }
///
/// let function = RawFunction::<dyn Fn() -> u8>::new::<_, DeepClone>(Overloaded(Seven));
/// assert!(function.target::<Overloaded<Seven>>().is_some());
/// assert!(function.target::<Seven>().is_none());
/// ```
#[derive(Clone, Copy, Debug, Default)]
#[repr(transparent)]
pub struct Overloaded<F>(pub F);

/// Invokes an [`Overloaded<F>`] through a shared reference.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `payload` points to a valid `Overloaded<F>`.
/// 2. No mutable reference to the payload is alive for the duration of the
///    call.
pub(crate) unsafe fn overload_ref<F, Args>(
    payload: NonNull<Erased>,
    args: Args,
) -> <F as Overload<Args>>::Output
where
    F: Overload<Args>,
{
    // SAFETY: Guaranteed by the caller (1 and 2).
    let payload: &Overloaded<F> = unsafe { payload.cast::<Overloaded<F>>().as_ref() };
    payload.0.call(args)
}

/// Invokes an [`Overloaded<F>`] through a mutable reference.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `payload` points to a valid `Overloaded<F>`.
/// 2. No other reference to the payload is alive for the duration of the
///    call.
pub(crate) unsafe fn overload_mut<F, Args>(
    payload: NonNull<Erased>,
    args: Args,
) -> <F as OverloadMut<Args>>::Output
where
    F: OverloadMut<Args>,
{
    // SAFETY: Guaranteed by the caller (1 and 2).
    let payload: &mut Overloaded<F> = unsafe { payload.cast::<Overloaded<F>>().as_mut() };
    payload.0.call_mut(args)
}

/// Moves an [`Overloaded<F>`] out and invokes it.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `payload` points to a valid `Overloaded<F>`.
/// 2. The payload is considered moved out after this call, and is neither
///    used nor dropped again.
pub(crate) unsafe fn overload_once<F, Args>(
    payload: NonNull<Erased>,
    args: Args,
) -> <F as OverloadMut<Args>>::Output
where
    F: OverloadMut<Args>,
{
    // SAFETY: Guaranteed by the caller (1 and 2).
    let mut payload: Overloaded<F> = unsafe { payload.cast::<Overloaded<F>>().read() };
    payload.0.call_mut(args)
}
