//! Kiln IR - foundation types shared by every compiler crate.
//!
//! - [`Span`]: compact source locations
//! - [`Name`]: interned identifiers
//! - [`StringInterner`]: the table behind [`Name`]
//!
//! Every type here is `Copy` (or cheaply shareable) and implements
//! `Eq + Hash`, so it can be used directly inside cache keys.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod interner;
mod name;
mod span;

pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use span::{Span, SpanError};
