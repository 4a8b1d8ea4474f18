//! Signature impls for closure trait objects with zero to eight arguments.
//!
//! For every arity and every closure trait, [`impl_signatures!`] generates:
//!
//! - the [`Signature`](crate::Signature) and
//!   [`SignatureSet`](crate::SignatureSet) impls for the trait object
//! - the [`Implements`](crate::Implements) impls giving the invocation entry
//!   of any closure of matching type, and of an
//!   [`Overloaded`](crate::Overloaded) wrapper
//! - the [`Callable`](crate::Callable) impl for the single-signature set

/// Generates the signature impls for one arity.
///
/// Each argument is given as a type parameter name followed by the name used
/// to bind it in the generated entries.
macro_rules! impl_signatures {
    ($module:ident, $count:literal; $($arg:ident $value:ident),*) => {
        #[doc = concat!("Signatures taking ", stringify!($count), " arguments.")]
        mod $module {
            use core::ptr::NonNull;

            use crate::{
                signature::{
                    ByMut, ByRef, ByValue, Callable, ErasedEntry, Implements, Overload,
                    OverloadMut, Overloaded, Signature, SignatureSet, erase,
                    overload::{overload_mut, overload_once, overload_ref},
                },
                util::Erased,
            };

            /// Invokes the payload through a shared reference.
            ///
            /// # Safety
            ///
            /// The caller must ensure:
            ///
            /// 1. `payload` points to a valid `P`.
            /// 2. No mutable reference to the payload is alive for the
            ///    duration of the call.
            unsafe fn call_ref<P, R, $($arg),*>(
                payload: NonNull<Erased>,
                ($($value,)*): ($($arg,)*),
            ) -> R
            where
                P: Fn($($arg),*) -> R,
            {
                // SAFETY: Guaranteed by the caller (1 and 2).
                let payload: &P = unsafe { payload.cast::<P>().as_ref() };
                payload($($value),*)
            }

            /// Invokes the payload through a mutable reference.
            ///
            /// # Safety
            ///
            /// The caller must ensure:
            ///
            /// 1. `payload` points to a valid `P`.
            /// 2. No other reference to the payload is alive for the duration
            ///    of the call.
            unsafe fn call_mut<P, R, $($arg),*>(
                payload: NonNull<Erased>,
                ($($value,)*): ($($arg,)*),
            ) -> R
            where
                P: FnMut($($arg),*) -> R,
            {
                // SAFETY: Guaranteed by the caller (1 and 2).
                let payload: &mut P = unsafe { payload.cast::<P>().as_mut() };
                payload($($value),*)
            }

            /// Moves the payload out and invokes it by value.
            ///
            /// # Safety
            ///
            /// The caller must ensure:
            ///
            /// 1. `payload` points to a valid `P`.
            /// 2. The payload is considered moved out after this call, and is
            ///    neither used nor dropped again.
            unsafe fn call_once<P, R, $($arg),*>(
                payload: NonNull<Erased>,
                ($($value,)*): ($($arg,)*),
            ) -> R
            where
                P: FnOnce($($arg),*) -> R,
            {
                // SAFETY: Guaranteed by the caller (1 and 2).
                let payload: P = unsafe { payload.cast::<P>().read() };
                payload($($value),*)
            }

            // SAFETY:
            // 1. The entries below for `dyn Fn` are built from `call_ref` and
            //    `overload_ref`, which take `($($arg,)*)` and return `R`.
            // 2. Both only create a shared reference to the payload.
            unsafe impl<R, $($arg),*> Signature for dyn Fn($($arg),*) -> R {
                type Args = ($($arg,)*);
                type Output = R;
                type Receiver = ByRef;
            }

            // SAFETY:
            // 1. The entries below for `dyn FnMut` are built from `call_mut`
            //    and `overload_mut`, which take `($($arg,)*)` and return `R`.
            // 2. Both only create a mutable reference to the payload.
            unsafe impl<R, $($arg),*> Signature for dyn FnMut($($arg),*) -> R {
                type Args = ($($arg,)*);
                type Output = R;
                type Receiver = ByMut;
            }

            // SAFETY:
            // 1. The entries below for `dyn FnOnce` are built from `call_once`
            //    and `overload_once`, which take `($($arg,)*)` and return `R`.
            // 2. Both move the payload out.
            unsafe impl<R, $($arg),*> Signature for dyn FnOnce($($arg),*) -> R {
                type Args = ($($arg,)*);
                type Output = R;
                type Receiver = ByValue;
            }

            // SAFETY: A single signature.
            unsafe impl<R, $($arg),*> SignatureSet for dyn Fn($($arg),*) -> R {
                const LEN: usize = 1;
            }

            // SAFETY: A single signature.
            unsafe impl<R, $($arg),*> SignatureSet for dyn FnMut($($arg),*) -> R {
                const LEN: usize = 1;
            }

            // SAFETY: A single signature.
            unsafe impl<R, $($arg),*> SignatureSet for dyn FnOnce($($arg),*) -> R {
                const LEN: usize = 1;
            }

            // SAFETY: `call_ref::<P, ..>` invokes a `P` through a shared
            // reference.
            unsafe impl<P, R, $($arg),*> Implements<dyn Fn($($arg),*) -> R> for P
            where
                P: Fn($($arg),*) -> R + 'static,
            {
                const ENTRY: ErasedEntry = erase::<($($arg,)*), R>(call_ref::<P, R, $($arg),*>);
            }

            // SAFETY: `call_mut::<P, ..>` invokes a `P` through a mutable
            // reference.
            unsafe impl<P, R, $($arg),*> Implements<dyn FnMut($($arg),*) -> R> for P
            where
                P: FnMut($($arg),*) -> R + 'static,
            {
                const ENTRY: ErasedEntry = erase::<($($arg,)*), R>(call_mut::<P, R, $($arg),*>);
            }

            // SAFETY: `call_once::<P, ..>` moves a `P` out and invokes it.
            unsafe impl<P, R, $($arg),*> Implements<dyn FnOnce($($arg),*) -> R> for P
            where
                P: FnOnce($($arg),*) -> R + 'static,
            {
                const ENTRY: ErasedEntry = erase::<($($arg,)*), R>(call_once::<P, R, $($arg),*>);
            }

            // SAFETY: `overload_ref::<F, ..>` invokes an `Overloaded<F>`
            // through a shared reference.
            unsafe impl<F, R, $($arg),*> Implements<dyn Fn($($arg),*) -> R> for Overloaded<F>
            where
                F: Overload<($($arg,)*), Output = R> + 'static,
            {
                const ENTRY: ErasedEntry =
                    erase::<($($arg,)*), R>(overload_ref::<F, ($($arg,)*)>);
            }

            // SAFETY: `overload_mut::<F, ..>` invokes an `Overloaded<F>`
            // through a mutable reference.
            unsafe impl<F, R, $($arg),*> Implements<dyn FnMut($($arg),*) -> R> for Overloaded<F>
            where
                F: OverloadMut<($($arg,)*), Output = R> + 'static,
            {
                const ENTRY: ErasedEntry =
                    erase::<($($arg,)*), R>(overload_mut::<F, ($($arg,)*)>);
            }

            // SAFETY: `overload_once::<F, ..>` moves an `Overloaded<F>` out
            // and invokes it.
            unsafe impl<F, R, $($arg),*> Implements<dyn FnOnce($($arg),*) -> R> for Overloaded<F>
            where
                F: OverloadMut<($($arg,)*), Output = R> + 'static,
            {
                const ENTRY: ErasedEntry =
                    erase::<($($arg,)*), R>(overload_once::<F, ($($arg,)*)>);
            }

            // SAFETY: The only entry of a single signature.
            unsafe impl<P, R, $($arg),*> Callable<dyn Fn($($arg),*) -> R> for P
            where
                P: Implements<dyn Fn($($arg),*) -> R>,
            {
                const ENTRIES: &'static [ErasedEntry] =
                    &[<P as Implements<dyn Fn($($arg),*) -> R>>::ENTRY];
            }

            // SAFETY: The only entry of a single signature.
            unsafe impl<P, R, $($arg),*> Callable<dyn FnMut($($arg),*) -> R> for P
            where
                P: Implements<dyn FnMut($($arg),*) -> R>,
            {
                const ENTRIES: &'static [ErasedEntry] =
                    &[<P as Implements<dyn FnMut($($arg),*) -> R>>::ENTRY];
            }

            // SAFETY: The only entry of a single signature.
            unsafe impl<P, R, $($arg),*> Callable<dyn FnOnce($($arg),*) -> R> for P
            where
                P: Implements<dyn FnOnce($($arg),*) -> R>,
            {
                const ENTRIES: &'static [ErasedEntry] =
                    &[<P as Implements<dyn FnOnce($($arg),*) -> R>>::ENTRY];
            }
        }
    };
}

impl_signatures!(arity_0, 0;);
impl_signatures!(arity_1, 1; A0 a0);
impl_signatures!(arity_2, 2; A0 a0, A1 a1);
impl_signatures!(arity_3, 3; A0 a0, A1 a1, A2 a2);
impl_signatures!(arity_4, 4; A0 a0, A1 a1, A2 a2, A3 a3);
impl_signatures!(arity_5, 5; A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
impl_signatures!(arity_6, 6; A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_signatures!(arity_7, 7; A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_signatures!(arity_8, 8; A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
