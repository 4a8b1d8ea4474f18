#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`polyfn`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased storage and the unsafe
//! dispatch that power the [`polyfn`] function wrappers. It turns any
//! callable into a fixed-size value: a pointer to a static vtable and an
//! inline slot of three machine words.
//!
//! **This crate is an implementation detail.** No semantic versioning guarantees
//! are provided. Users should depend on the [`polyfn`] crate, not this one.
//!
//! # Architecture
//!
//! - **[`erasure`]**: How a payload occupies the slot
//!   - [`Local`]: the payload is stored inline
//!   - [`Pointer`]: a `Copy` pointer-like payload stored inline
//!   - [`Allocated`]: the payload lives in a block of an [`Allocator`]
//!
//! - **[`signature`]**: Call signatures and compile-time overload resolution
//!   - [`Signature`]: implemented for `dyn Fn`, `dyn FnMut` and `dyn FnOnce`
//!   - [`Callable`]: the invocation entries of a payload for a signature set
//!   - [`Select`]: picks the signature a call resolves to
//!
//! - **[`function`]**: The container
//!   - [`RawFunction`]: a vtable reference and a slot
//!   - [`FunctionVtable`]: function pointers for type-erased dispatch
//!   - [`Cloning`]: whether the vtable can clone its erasure
//!
//! # Safety Strategy
//!
//! A payload of type `P` is forgotten as soon as it is moved into the slot.
//! Every later access relies on the vtable having been created for the exact
//! erasure in the slot, and on the signature set having been checked against
//! `P` at that point.
//!
//! This crate maintains safety through:
//!
//! - **Module-based encapsulation**: Safety-critical types keep fields
//!   module-private, making invariants locally verifiable within a single file
//! - **`const` vtables**: Each vtable is built in a `const` block from the
//!   types it serves, so a vtable cannot be paired with the wrong erasure
//!   without going through an `unsafe` constructor
//! - **Documented contracts**: Every `unsafe fn` and `unsafe trait` lists what
//!   the caller or implementor must ensure
//!
//! [`polyfn`]: https://docs.rs/polyfn/latest/polyfn/
//! [`FunctionVtable`]: function::vtable::FunctionVtable
//! [`Allocator`]: allocator_api2::alloc::Allocator

extern crate alloc;

pub mod erasure;
pub mod function;
pub mod signature;
mod util;

pub use erasure::{Allocated, INLINE_CAPACITY, Local, Pointer, Slot, fits_inline};
pub use function::{CloneFn, Cloning, DeepClone, NoClone, RawFunction};
pub use signature::{
    AccessPath, ByMut, ByRef, ByValue, Callable, ErasedEntry, Here, Implements, N0, N1, N2, N3,
    N4, N5, N6, N7, Overload, OverloadMut, Overloaded, ReachableThrough, Select, Sig, Signature,
    SignatureSet,
};
