use core::fmt;

/// Error returned when an empty [`Function`](crate::Function) is invoked.
///
/// # Examples
///
/// ```
/// use polyfn::{BadFunctionCall, Function};
///
/// let empty: Function<dyn Fn() -> i32> = Function::empty();
/// assert_eq!(empty.call(()), Err(BadFunctionCall));
/// assert_eq!(BadFunctionCall.to_string(), "call to empty function");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct BadFunctionCall;

impl fmt::Display for BadFunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("call to empty function")
    }
}

impl core::error::Error for BadFunctionCall {}

#[cfg(feature = "std")]
impl From<BadFunctionCall> for std::io::Error {
    fn from(error: BadFunctionCall) -> Self {
        std::io::Error::other(error)
    }
}

/// Builds the error of an invocation of an empty function with the signature
/// set `S`.
#[cold]
pub(crate) fn empty_call<S: ?Sized>() -> BadFunctionCall {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        signature = core::any::type_name::<S>(),
        "invoked an empty function"
    );
    BadFunctionCall
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BadFunctionCall.to_string(), "call to empty function");
        assert_eq!(empty_call::<dyn Fn()>(), BadFunctionCall);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_into_io_error() {
        let error: std::io::Error = BadFunctionCall.into();
        assert_eq!(error.kind(), std::io::ErrorKind::Other);
        assert_eq!(error.to_string(), "call to empty function");
    }
}
