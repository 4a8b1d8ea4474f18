//! Integration tests for `Function`.
//!
//! ## Allocation Tests
//! - `test_large_callable_allocates_once`: one block per stored callable
//! - `test_failed_allocation_leaves_function_empty`: `try_set_in` drops the
//!   previous callable and reports the failure
//! - `test_clone_allocates_independent_block`: clones never share state
//!
//! ## Assignment Tests
//! - `test_panicking_factory_leaves_function_empty`: `set_with` when the
//!   factory panics
//! - `test_swap_inline_and_allocated`: swapping mixed storage kinds
//!
//! ## Query Tests
//! - `test_target_of_allocated_callable`: reading and mutating a callable
//!   stored behind an allocation
//!
//! ## Error Tests
//! - `test_bad_call_as_error_source`: `BadFunctionCall` inside a derived
//!   error enum
//!
//! ## Thread Tests
//! - `test_shared_calls_across_threads`: a `Function` behind `&` from scoped
//!   threads

use std::{
    alloc::Layout,
    panic::{AssertUnwindSafe, catch_unwind},
    ptr::NonNull,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use polyfn::{
    AllocError, Allocator, BadFunctionCall, Empty, Function, Global, Overload, Overloaded,
    UniqueFunction,
};

/// Allocator delegating to [`Global`] while counting blocks.
#[derive(Clone, Default)]
struct CountingAlloc {
    allocations: Arc<AtomicUsize>,
    deallocations: Arc<AtomicUsize>,
}

impl CountingAlloc {
    fn counts(&self) -> (usize, usize) {
        (
            self.allocations.load(Ordering::SeqCst),
            self.deallocations.load(Ordering::SeqCst),
        )
    }
}

unsafe impl Allocator for CountingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// Allocator that always fails.
#[derive(Clone, Copy)]
struct FailingAlloc;

unsafe impl Allocator for FailingAlloc {
    fn allocate(&self, _layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        Err(AllocError)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("nothing was ever allocated")
    }
}

#[test]
fn test_large_callable_allocates_once() {
    let alloc = CountingAlloc::default();
    let weights = [1_u64, 2, 3, 4, 5, 6, 7, 8];

    let dot: Function<dyn Fn(u64) -> u64> = Function::new_in(
        move |scale: u64| weights.iter().map(|w| w * scale).sum::<u64>(),
        alloc.clone(),
    );
    assert_eq!(alloc.counts(), (1, 0));
    assert_eq!(dot.call((2,)), Ok(72));
    assert_eq!(dot.call((0,)), Ok(0));
    assert_eq!(alloc.counts(), (1, 0));

    drop(dot);
    assert_eq!(alloc.counts(), (1, 1));
}

#[test]
fn test_small_callable_never_allocates() {
    let alloc = CountingAlloc::default();
    let function: Function<dyn Fn() -> u8> = Function::new_in(|| 1_u8, alloc.clone());
    let cloned = function.clone();
    assert_eq!(cloned.call(()), Ok(1));
    drop((function, cloned));
    assert_eq!(alloc.counts(), (0, 0));
}

#[test]
fn test_failed_allocation_leaves_function_empty() {
    let dropped = Arc::new(AtomicUsize::new(0));

    struct Guard(Arc<AtomicUsize>);
    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let guard = Guard(dropped.clone());
    let mut function: UniqueFunction<dyn Fn() -> usize> = UniqueFunction::new(move || {
        let _ = &guard;
        1
    });

    let table = [0_u8; 64];
    let result = function.try_set_in(move || table.len(), FailingAlloc);
    assert_eq!(result, Err(AllocError));
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
    assert!(function == Empty);
    assert_eq!(function.call(()), Err(BadFunctionCall));
}

#[test]
fn test_clone_allocates_independent_block() {
    let alloc = CountingAlloc::default();
    let mut history = [0_u64; 8];
    let mut record: Function<dyn FnMut(u64) -> u64> = Function::new_in(
        move |value: u64| {
            history.rotate_right(1);
            history[0] = value;
            history.iter().sum::<u64>()
        },
        alloc.clone(),
    );

    assert_eq!(record.call_mut((5,)), Ok(5));
    let mut copy = record.clone();
    assert_eq!(alloc.counts(), (2, 0));

    assert_eq!(record.call_mut((1,)), Ok(6));
    assert_eq!(copy.call_mut((10,)), Ok(15));

    drop(record);
    assert_eq!(alloc.counts(), (2, 1));
    assert_eq!(copy.call_mut((0,)), Ok(15));
    drop(copy);
    assert_eq!(alloc.counts(), (2, 2));
}

#[test]
fn test_panicking_factory_leaves_function_empty() {
    let mut function: Function<dyn Fn() -> i32> = Function::new(|| 1);

    let result = catch_unwind(AssertUnwindSafe(|| {
        function.set_with(|| -> fn() -> i32 { panic!("factory failed") });
    }));
    assert!(result.is_err());
    assert!(function.is_empty());

    function.set(|| 2);
    assert_eq!(function.call(()), Ok(2));
}

#[test]
fn test_swap_inline_and_allocated() {
    let padding = [7_u64; 8];
    let mut small: Function<dyn Fn() -> u64> = Function::new(|| 1_u64);
    let mut large: Function<dyn Fn() -> u64> = Function::new(move || padding[0]);

    small.swap(&mut large);
    assert_eq!(small.call(()), Ok(7));
    assert_eq!(large.call(()), Ok(1));

    std::mem::swap(&mut small, &mut large);
    assert_eq!(small.call(()), Ok(1));
    assert_eq!(large.call(()), Ok(7));
}

#[test]
fn test_target_of_allocated_callable() {
    #[derive(Clone)]
    struct Table {
        cells: [u64; 8],
    }

    impl Overload<(usize,)> for Table {
        type Output = u64;

        fn call(&self, (index,): (usize,)) -> u64 {
            self.cells[index]
        }
    }

    let alloc = CountingAlloc::default();
    let mut lookup: Function<dyn Fn(usize) -> u64> =
        Function::new_in(Overloaded(Table { cells: [7; 8] }), alloc.clone());
    assert_eq!(alloc.counts(), (1, 0));

    assert!(lookup.target::<Table>().is_none());
    assert_eq!(
        lookup.target::<Overloaded<Table>>().map(|table| table.0.cells),
        Some([7; 8])
    );

    let table = lookup.target_mut::<Overloaded<Table>>().unwrap();
    table.0.cells[3] = 107;
    assert_eq!(lookup.call((3,)), Ok(107));
    assert_eq!(lookup.call((4,)), Ok(7));
    assert_eq!(alloc.counts(), (1, 0));
}

#[test]
fn test_shared_calls_across_threads() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let push: Function<dyn Fn(usize)> = Function::new(move |value: usize| {
        sink.lock().unwrap().push(value);
    });

    thread::scope(|scope| {
        for value in 0..4 {
            let push = &push;
            scope.spawn(move || push.call((value,)).unwrap());
        }
    });

    let mut seen = seen.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[test]
fn test_debug_names_target() {
    fn zero() -> u8 {
        0
    }

    let function: Function<dyn Fn() -> u8> = Function::from_ptr(Some(zero as fn() -> u8));
    let debug = format!("{function:?}");
    assert!(debug.starts_with("Function { target: "));
    assert!(debug.contains("fn() -> u8"));
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error("stage is not configured")]
    Unconfigured(#[from] BadFunctionCall),
    #[error("stage rejected {0}")]
    Rejected(u32),
}

#[test]
fn test_bad_call_as_error_source() {
    fn run(stage: &Function<dyn Fn(u32) -> bool>, input: u32) -> Result<u32, PipelineError> {
        if stage.call((input,))? {
            Ok(input)
        } else {
            Err(PipelineError::Rejected(input))
        }
    }

    let even: Function<dyn Fn(u32) -> bool> = Function::new(|x: u32| x % 2 == 0);
    assert_eq!(run(&even, 4).unwrap(), 4);
    assert_eq!(run(&even, 3).unwrap_err().to_string(), "stage rejected 3");

    let error = run(&Function::empty(), 4).unwrap_err();
    assert_eq!(error.to_string(), "stage is not configured");
    let source = std::error::Error::source(&error).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("call to empty function"));
}

#[cfg(feature = "std")]
#[test]
fn test_bad_call_converts_into_io_error() {
    fn run(function: &Function<dyn Fn() -> u8>) -> std::io::Result<u8> {
        Ok(function.call(())?)
    }

    let error = run(&Function::empty()).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::Other);
    assert_eq!(run(&Function::new(|| 9_u8)).unwrap(), 9);
}
