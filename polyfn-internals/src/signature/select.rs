//! Signature sets made of tuples of [`Sig`].

use crate::signature::{
    Callable, ErasedEntry, Here, Implements, N0, N1, N2, N3, N4, N5, N6, N7, Select, Sig,
    SignatureSet,
};

/// Generates the impls for a tuple of signatures.
///
/// Each element is given as the type parameter naming the signature, the
/// index marker of its position and the position itself.
macro_rules! impl_signature_tuple {
    (@select $all:tt; $($sig:ident $index:ident $position:literal),+) => {
        $(impl_signature_tuple!(@select_one $all; $sig $index $position);)+
    };

    (@select_one [$($all:ident),+]; $sig:ident $index:ident $position:literal) => {
        // SAFETY:
        // 1. `$sig` is the element at `$position`, and accepts `Args` since it
        //    implements `Select<Path, Args, Here>`.
        // 2. Its receiver is reachable through `Path` for the same reason.
        // 3. Forwarded from the element.
        unsafe impl<Path, Args, $($all: ?Sized),+> Select<Path, Args, $index> for ($(Sig<$all>,)+)
        where
            Path: crate::signature::AccessPath,
            $sig: Select<Path, Args, Here>,
        {
            type Output = <$sig as Select<Path, Args, Here>>::Output;

            const INDEX: usize = $position;
            const CONSUMES: bool = <$sig as Select<Path, Args, Here>>::CONSUMES;
        }
    };

    ($len:literal; $($sig:ident $index:ident $position:literal),+) => {
        // SAFETY: One signature per element.
        unsafe impl<$($sig: ?Sized),+> SignatureSet for ($(Sig<$sig>,)+) {
            const LEN: usize = $len;
        }

        // SAFETY: One entry per element, in order, each taken from the
        // `Implements` impl of the element.
        unsafe impl<P, $($sig: ?Sized),+> Callable<($(Sig<$sig>,)+)> for P
        where
            $(P: Implements<$sig>,)+
        {
            const ENTRIES: &'static [ErasedEntry] = &[$(<P as Implements<$sig>>::ENTRY),+];
        }

        impl_signature_tuple!(@select [$($sig),+]; $($sig $index $position),+);
    };
}

impl_signature_tuple!(1; S0 N0 0);
impl_signature_tuple!(2; S0 N0 0, S1 N1 1);
impl_signature_tuple!(3; S0 N0 0, S1 N1 1, S2 N2 2);
impl_signature_tuple!(4; S0 N0 0, S1 N1 1, S2 N2 2, S3 N3 3);
impl_signature_tuple!(5; S0 N0 0, S1 N1 1, S2 N2 2, S3 N3 3, S4 N4 4);
impl_signature_tuple!(6; S0 N0 0, S1 N1 1, S2 N2 2, S3 N3 3, S4 N4 4, S5 N5 5);
impl_signature_tuple!(7; S0 N0 0, S1 N1 1, S2 N2 2, S3 N3 3, S4 N4 4, S5 N5 5, S6 N6 6);
impl_signature_tuple!(8; S0 N0 0, S1 N1 1, S2 N2 2, S3 N3 3, S4 N4 4, S5 N5 5, S6 N6 6, S7 N7 7);
