//! Stack growth for the recursive passes.
//!
//! Parser, resolver and interpreter all recurse once per nesting level of the
//! program.  Each recursive entry point wraps its body in
//! [`ensure_sufficient_stack`], which grows the stack on demand instead of
//! letting deeply nested input crash the host process.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than [`RED_ZONE`] remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
