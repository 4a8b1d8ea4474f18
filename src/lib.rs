#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Type-erased callables with several signatures, inline storage and custom
//! allocators.
//!
//! ## Overview
//!
//! A [`Function<S>`] stores any callable implementing the signature set `S`,
//! hides its concrete type and forwards calls to it. Unlike `Box<dyn Fn>`, a
//! single [`Function`] can expose several signatures at once, small callables
//! are stored inline without allocating, and large callables can be placed
//! in a custom [`Allocator`].
//!
//! ## Quick Example
//!
//! ```
//! use polyfn::Function;
//!
//! let offset = 10;
//! let add: Function<dyn Fn(i32) -> i32> = Function::new(move |x: i32| x + offset);
//! assert_eq!(add.call((5,)), Ok(15));
//!
//! // An empty function reports the failed call instead of panicking
//! let empty: Function<dyn Fn(i32) -> i32> = Function::empty();
//! assert!(empty.call((5,)).is_err());
//! ```
//!
//! ## Signature Sets
//!
//! The signature set `S` is either a single signature, written as a trait
//! object type such as `dyn Fn(i32) -> i32`, or a tuple of up to eight
//! signatures wrapped in [`Sig`]:
//!
//! ```
//! use polyfn::{Function, Overload, OverloadMut, Overloaded, Sig};
//!
//! #[derive(Clone, Default)]
//! struct Log {
//!     entries: Vec<String>,
//! }
//!
//! impl Overload<()> for Log {
//!     type Output = usize;
//!     fn call(&self, (): ()) -> usize {
//!         self.entries.len()
//!     }
//! }
//!
//! impl OverloadMut<(&'static str,)> for Log {
//!     type Output = ();
//!     fn call_mut(&mut self, (entry,): (&'static str,)) {
//!         self.entries.push(entry.to_owned());
//!     }
//! }
//!
//! let mut log: Function<(Sig<dyn Fn() -> usize>, Sig<dyn FnMut(&'static str)>)> =
//!     Function::new(Overloaded(Log::default()));
//! log.call_mut(("started",)).unwrap();
//! log.call_mut(("stopped",)).unwrap();
//! assert_eq!(log.call(()), Ok(2));
//! ```
//!
//! The signature to invoke is picked from the type of the argument tuple.
//! Closures implement exactly one signature. Types implementing several
//! signatures do so through [`Overload`] and [`OverloadMut`], and are stored
//! wrapped in [`Overloaded`].
//!
//! Each signature declares how the callable is reached:
//!
//! | Signature   | [`Function::call`] | [`Function::call_mut`] | [`Function::call_once`] |
//! |-------------|:------------------:|:----------------------:|:-----------------------:|
//! | `dyn Fn`    | yes                | yes                    | yes                     |
//! | `dyn FnMut` | no                 | yes                    | yes                     |
//! | `dyn FnOnce`| no                 | no                     | yes                     |
//!
//! ## Storage
//!
//! Callables of at most [`INLINE_CAPACITY`] bytes, with an alignment no
//! larger than a pointer's, live inside the [`Function`] itself. Larger
//! callables are moved into a block from the global allocator, or from the
//! allocator passed to [`Function::new_in`]. Assigning a new callable always
//! drops the old one first, so a failed allocation leaves the function empty.
//!
//! ## Cloneability and Thread Safety
//!
//! The [`markers`] module describes the two remaining type parameters. By
//! default a [`Function`] is `Clone` and `Send + Sync`, and only accepts
//! callables that are as well. [`UniqueFunction`] lifts the `Clone`
//! requirement, and [`markers::Local`] lifts the thread-safety requirement.
//!
//! ## Features
//!
//! - `std`: Adds a conversion from [`BadFunctionCall`] into
//!   `std::io::Error`.
//! - `tracing`: Emits [`tracing`](https://docs.rs/tracing) events when
//!   callables are stored, when an empty function is called and when the
//!   deprecated [`Function::call_const_unchecked`] is used.
//!
//! ## Project Structure
//!
//! The low-level storage, vtables and signature machinery live in the
//! [`polyfn-internals`](polyfn_internals) crate, where all unsafe code is
//! audited in one place. This crate wraps them in a safe API whose type
//! parameters decide which callables are accepted.

extern crate alloc;
#[cfg(all(feature = "std", not(doc)))]
extern crate std;

pub mod markers;
pub mod prelude;

mod error;
mod function;

pub use allocator_api2::alloc::{AllocError, Allocator, Global};
pub use polyfn_internals::{
    INLINE_CAPACITY, Overload, OverloadMut, Overloaded, Sig, fits_inline, signature,
};

pub use self::{
    error::BadFunctionCall,
    function::{Empty, Function, UniqueFunction},
};
