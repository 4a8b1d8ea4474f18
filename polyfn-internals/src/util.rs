//! Internal utility types.

/// Marker type used when type-erasing the payload of a function.
///
/// Invocation entries receive a `NonNull<Erased>` pointing at the payload of
/// whatever erasure currently occupies the slot, and cast it back to the
/// concrete payload type they were generated for.
///
/// Using a distinct marker type (rather than `()`) makes the intent clearer
/// in type signatures.
pub(crate) struct Erased;
