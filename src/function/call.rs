use polyfn_internals::{ByMut, ByRef, ByValue, Select};

use crate::{BadFunctionCall, Function, error::empty_call};

impl<S: ?Sized, O, T> Function<S, O, T> {
    /// Invokes the signature selected by the type of `args` through a shared
    /// reference.
    ///
    /// Arguments are passed as a tuple, so a one-argument call is written
    /// `call((x,))`. Only `Fn` signatures are reachable this way.
    ///
    /// # Errors
    ///
    /// Returns [`BadFunctionCall`] if the function is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::{Function, Overload, Overloaded, Sig};
    ///
    /// #[derive(Clone)]
    /// struct Show;
    ///
    /// impl Overload<(i32,)> for Show {
    ///     type Output = String;
    ///     fn call(&self, (value,): (i32,)) -> String {
    ///         format!("int {value}")
    ///     }
    /// }
    ///
    /// impl Overload<(bool,)> for Show {
    ///     type Output = String;
    ///     fn call(&self, (value,): (bool,)) -> String {
    ///         format!("bool {value}")
    ///     }
    /// }
    ///
    /// let show: Function<(Sig<dyn Fn(i32) -> String>, Sig<dyn Fn(bool) -> String>)> =
    ///     Function::new(Overloaded(Show));
    /// assert_eq!(show.call((3_i32,)).as_deref(), Ok("int 3"));
    /// assert_eq!(show.call((true,)).as_deref(), Ok("bool true"));
    /// ```
    pub fn call<Args, I>(
        &self,
        args: Args,
    ) -> Result<<S as Select<ByRef, Args, I>>::Output, BadFunctionCall>
    where
        S: Select<ByRef, Args, I>,
    {
        self.as_raw().call_ref(args).ok_or_else(empty_call::<S>)
    }

    /// Invokes the signature selected by the type of `args` through a mutable
    /// reference.
    ///
    /// Both `Fn` and `FnMut` signatures are reachable this way.
    ///
    /// # Errors
    ///
    /// Returns [`BadFunctionCall`] if the function is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::UniqueFunction;
    ///
    /// let mut total = 0_u64;
    /// let mut add: UniqueFunction<dyn FnMut(u64) -> u64> = UniqueFunction::new(move |x: u64| {
    ///     total += x;
    ///     total
    /// });
    /// assert_eq!(add.call_mut((2,)), Ok(2));
    /// assert_eq!(add.call_mut((3,)), Ok(5));
    /// ```
    pub fn call_mut<Args, I>(
        &mut self,
        args: Args,
    ) -> Result<<S as Select<ByMut, Args, I>>::Output, BadFunctionCall>
    where
        S: Select<ByMut, Args, I>,
    {
        // SAFETY:
        // 1. The raw function is only called, never replaced.
        let raw = unsafe { self.as_raw_mut() };
        raw.call_mut(args).ok_or_else(empty_call::<S>)
    }

    /// Invokes the signature selected by the type of `args` by value,
    /// consuming the function.
    ///
    /// Every signature is reachable this way. If the selected signature is a
    /// `Fn` or `FnMut` signature, the callable is dropped after the call.
    ///
    /// Since every signature is reachable by value, two signatures taking the
    /// same arguments (such as `dyn FnMut(u32) -> u32` and
    /// `dyn FnOnce(u32) -> u32`) make the call ambiguous. Name the position
    /// in the set with a turbofish: `call_once::<(u32,), N1>((1,))`, where
    /// `N1` comes from [`polyfn::signature`](crate::signature).
    ///
    /// # Errors
    ///
    /// Returns [`BadFunctionCall`] if the function is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::UniqueFunction;
    ///
    /// let message = String::from("done");
    /// let finish: UniqueFunction<dyn FnOnce() -> String> = UniqueFunction::new(move || message);
    /// assert_eq!(finish.call_once(()).as_deref(), Ok("done"));
    /// ```
    pub fn call_once<Args, I>(
        self,
        args: Args,
    ) -> Result<<S as Select<ByValue, Args, I>>::Output, BadFunctionCall>
    where
        S: Select<ByValue, Args, I>,
    {
        self.into_raw().call_once(args).ok_or_else(empty_call::<S>)
    }

    /// Invokes a `FnMut` signature through a shared reference.
    ///
    /// This mirrors calling a mutable callable through a constant handle, and
    /// only exists for code that cannot be restructured to hold a mutable
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`BadFunctionCall`] if the function is empty.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. No other call of this function, and no reference obtained from
    ///    [`Function::target`], is alive for the duration of the call. This
    ///    includes calls from other threads and calls made by the callable
    ///    itself.
    #[deprecated(note = "mutates the callable through a shared reference; use `call_mut`")]
    pub unsafe fn call_const_unchecked<Args, I>(
        &self,
        args: Args,
    ) -> Result<<S as Select<ByMut, Args, I>>::Output, BadFunctionCall>
    where
        S: Select<ByMut, Args, I>,
    {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            signature = core::any::type_name::<S>(),
            "mutable callable invoked through a shared reference"
        );

        // SAFETY:
        // 1. Guaranteed by the caller (1).
        let result = unsafe { self.as_raw().call_const_unchecked(args) };
        result.ok_or_else(empty_call::<S>)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{
        format,
        rc::Rc,
        string::{String, ToString},
        vec,
    };
    use core::cell::Cell;

    use polyfn_internals::{N0, N1, Overload, OverloadMut, Overloaded, Sig};

    use crate::{
        Function, UniqueFunction,
        markers::{Local, Unique},
    };

    use super::*;

    #[test]
    fn test_call_plain_function() {
        fn add(a: i32, b: i32) -> i32 {
            a + b
        }

        let function: Function<dyn Fn(i32, i32) -> i32> =
            Function::from_ptr(Some(add as fn(i32, i32) -> i32));
        assert_eq!(function.call((2, 3)), Ok(5));
        assert_eq!(function.clone().call_once((4, 5)), Ok(9));
    }

    #[test]
    fn test_call_empty() {
        let mut function: Function<dyn FnMut(u8) -> u8> = Function::empty();
        assert_eq!(function.call_mut((1,)), Err(BadFunctionCall));
        assert_eq!(function.call_once((1,)), Err(BadFunctionCall));

        let function: Function<dyn Fn()> = Function::empty();
        assert_eq!(function.call(()), Err(BadFunctionCall));
    }

    #[test]
    fn test_call_after_take_fails() {
        let mut function: Function<dyn Fn() -> u8> = Function::new(|| 1_u8);
        let taken = function.take();
        assert_eq!(function.call(()), Err(BadFunctionCall));
        assert_eq!(taken.call(()), Ok(1));
    }

    #[derive(Clone, Default)]
    struct Console {
        lines: u32,
    }

    impl Overload<(i32,)> for Console {
        type Output = String;

        fn call(&self, (value,): (i32,)) -> String {
            format!("{value}")
        }
    }

    impl Overload<(&'static str, u32)> for Console {
        type Output = String;

        fn call(&self, (text, times): (&'static str, u32)) -> String {
            text.repeat(times as usize)
        }
    }

    impl OverloadMut<()> for Console {
        type Output = u32;

        fn call_mut(&mut self, (): ()) -> u32 {
            self.lines += 1;
            self.lines
        }
    }

    type ConsoleSet = (
        Sig<dyn Fn(i32) -> String>,
        Sig<dyn Fn(&'static str, u32) -> String>,
        Sig<dyn FnMut() -> u32>,
    );

    #[test]
    fn test_call_selects_by_arguments() {
        let mut console: Function<ConsoleSet> = Function::new(Overloaded(Console::default()));

        assert_eq!(console.call((12_i32,)), Ok("12".to_string()));
        assert_eq!(console.call(("ab", 3_u32)), Ok("ababab".to_string()));
        assert_eq!(console.call_mut(()), Ok(1));
        assert_eq!(console.call_mut(()), Ok(2));
        assert_eq!(console.call_mut((5_i32,)), Ok("5".to_string()));

        let copy = console.clone();
        assert_eq!(console.call_once(()), Ok(3));
        assert_eq!(
            copy.target::<Overloaded<Console>>().map(|console| console.0.lines),
            Some(2)
        );
    }

    #[test]
    fn test_call_once_moves_captures() {
        let items = vec![String::from("a"), String::from("b")];
        let function: UniqueFunction<dyn FnOnce() -> usize> =
            UniqueFunction::new(move || items.into_iter().count());
        assert_eq!(function.call_once(()), Ok(2));
    }

    #[test]
    fn test_call_once_drops_borrowing_callable() {
        let dropped = Rc::new(Cell::new(false));

        struct Flag(Rc<Cell<bool>>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let flag = Flag(dropped.clone());
        let function: Function<dyn Fn() -> u8, Unique, Local> = Function::new(move || {
            let _ = &flag;
            4
        });
        assert_eq!(function.call_once(()), Ok(4));
        assert!(dropped.get());
    }

    #[test]
    #[allow(deprecated)]
    fn test_call_const_unchecked() {
        let mut seen = 0_u32;
        let function: UniqueFunction<dyn FnMut() -> u32> = UniqueFunction::new(move || {
            seen += 1;
            seen
        });

        // SAFETY: No other call or reference to the callable is alive.
        assert_eq!(unsafe { function.call_const_unchecked(()) }, Ok(1));
        // SAFETY: No other call or reference to the callable is alive.
        assert_eq!(unsafe { function.call_const_unchecked(()) }, Ok(2));

        let empty: UniqueFunction<dyn FnMut() -> u32> = UniqueFunction::empty();
        // SAFETY: The function is empty.
        assert_eq!(unsafe { empty.call_const_unchecked(()) }, Err(BadFunctionCall));
    }

    #[test]
    fn test_call_once_with_explicit_index() {
        #[derive(Clone)]
        struct Step {
            taken: u32,
        }

        impl OverloadMut<(u32,)> for Step {
            type Output = u32;

            fn call_mut(&mut self, (by,): (u32,)) -> u32 {
                self.taken += by;
                self.taken
            }
        }

        type StepSet = (Sig<dyn FnMut(u32) -> u32>, Sig<dyn FnOnce(u32) -> u32>);

        let mut step: Function<StepSet> = Function::new(Overloaded(Step { taken: 0 }));
        assert_eq!(step.call_mut((1,)), Ok(1));
        assert_eq!(step.call_once::<(u32,), N1>((1,)), Ok(2));

        let step: Function<StepSet> = Function::new(Overloaded(Step { taken: 5 }));
        assert_eq!(step.call_once::<(u32,), N0>((2,)), Ok(7));
    }
}
