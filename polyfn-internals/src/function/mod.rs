//! The function container and its vtable.
//!
//! [`RawFunction`] pairs a [`Slot`](crate::Slot) with a `&'static`
//! [`FunctionVtable`](vtable::FunctionVtable). The vtable is chosen when the
//! payload is stored, from the erasure the payload ends up in and from the
//! [`Cloning`] mode requested by the caller.

mod raw;
pub(crate) mod vtable;

pub use self::{
    raw::RawFunction,
    vtable::{CloneFn, Cloning, DeepClone, NoClone},
};
