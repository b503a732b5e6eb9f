//! Stack safety for deep instantiation chains.
//!
//! Every nested instantiation re-enters the semantic service, so a chain
//! near the recursion limit can exhaust the default thread stack long
//! before the limit fires. Recursive entry points grow the stack on demand.

/// Minimum stack space to keep free.
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM has a fixed stack; call through.
#[cfg(target_arch = "wasm32")]
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
