//! Diagnostic system for template instantiation errors.
//!
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Primary span (where it went wrong)
//! - Notes carrying the instantiation trace ("instantiated from here")
//!
//! # Gagging
//!
//! Speculative work (probing whether an overload applies at all) runs with
//! the queue *gagged*: errors are counted but never surfaced. See
//! [`DiagnosticQueue::push_gag`].
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is proof that at least one error reached the queue.

mod diagnostic;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
