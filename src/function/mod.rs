//! The [`Function`] container.
//!
//! A [`Function<S, O, T>`] stores any callable implementing the signature set
//! `S` and forwards calls to it. The callable lives in an inline slot of
//! [`INLINE_CAPACITY`](crate::INLINE_CAPACITY) bytes when it fits there, and
//! behind an allocation otherwise.
//!
//! The implementation is split in two files:
//!
//! - `owned.rs`: the type, construction, assignment and queries
//! - `call.rs`: invocation through the three access paths

mod call;
mod owned;

pub use self::owned::{Empty, Function, UniqueFunction};
