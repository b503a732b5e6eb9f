//! Type-level proof that an error was emitted.

use std::fmt;

/// Proof that at least one error diagnostic was emitted.
///
/// Only the queue hands these out, so a function returning
/// `Result<_, ErrorGuaranteed>` cannot fail silently.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    pub(crate) const fn new() -> Self {
        ErrorGuaranteed(())
    }

    /// Produce a guarantee when `count` errors are known to exist.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then(Self::new)
    }
}

impl fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error(s) emitted")
    }
}

#[cfg(test)]
mod tests;
