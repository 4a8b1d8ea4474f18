//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use polyfn::prelude::*;
//!
//! let square: Function<dyn Fn(u32) -> u32> = Function::new(|x: u32| x * x);
//! assert_eq!(square.call((4,)), Ok(16));
//! ```
//!
//! # What's Included
//!
//! - **[`Function`]** and **[`UniqueFunction`]**: The callable containers
//! - **[`Empty`]** and **[`BadFunctionCall`]**: The empty token and the error
//!   of calling an empty function
//! - **[`Sig`]**: Wrapper for signatures in a signature set
//! - **[`Overload`]**, **[`OverloadMut`]** and **[`Overloaded`]**: Defining
//!   callables with several signatures
//! - **[`markers`]**: Type markers for controlling cloneability and thread
//!   safety

pub use crate::{
    BadFunctionCall, Empty, Function, Overload, OverloadMut, Overloaded, Sig, UniqueFunction,
    markers,
};
