//! Diagnostic queue for collecting, deduplicating and gagging diagnostics.
//!
//! Features:
//! - Error limits, with one "too many errors" diagnostic once hit
//! - Deduplication of repeated errors at the same location
//! - Gagging: nested speculative regions where errors are counted, not kept
//! - `ErrorGuaranteed` proof that errors were emitted

use std::hash::{Hash, Hasher};

use kiln_ir::Span;
use rustc_hash::FxHasher;

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

/// Number of characters to use for message prefix deduplication.
const MESSAGE_PREFIX_LEN: usize = 30;

#[inline]
fn message_prefix_hash(msg: &str) -> u64 {
    let byte_end = msg
        .char_indices()
        .nth(MESSAGE_PREFIX_LEN)
        .map_or(msg.len(), |(idx, _)| idx);
    let mut hasher = FxHasher::default();
    msg[..byte_end].hash(&mut hasher);
    hasher.finish()
}

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors before stopping (0 = unlimited).
    pub error_limit: usize,
    /// Drop an error identical in location and message prefix to the last one.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 20,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no limits (for testing).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Snapshot returned by [`DiagnosticQueue::push_gag`].
///
/// Hand it back to [`DiagnosticQueue::pop_gag`] to close the region.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use = "every gag must be popped"]
pub struct GagMark {
    gagged_before: usize,
}

/// Queue for collecting diagnostics.
///
/// # Example
///
/// ```text
/// let mark = queue.push_gag();
/// // ... speculative matching, errors are only counted ...
/// let suppressed = queue.pop_gag(mark);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    /// Count of surfaced errors.
    error_count: usize,
    /// Count of errors swallowed by gags, over the queue's lifetime.
    gagged_errors: usize,
    /// Nesting depth of active gags.
    gag_depth: u32,
    /// Last (span, `message_prefix_hash`) for dedup.
    last_error: Option<(Option<Span>, u64)>,
    /// Set once the "too many errors" diagnostic has been queued.
    limit_reported: bool,
    config: DiagnosticConfig,
}

impl Default for DiagnosticQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticQueue {
    /// Create a new diagnostic queue with default configuration.
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    /// Create a diagnostic queue with custom configuration.
    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            gagged_errors: 0,
            gag_depth: 0,
            last_error: None,
            limit_reported: false,
            config,
        }
    }

    /// Add a diagnostic.
    ///
    /// Returns `true` if the diagnostic was kept, `false` if it was gagged,
    /// deduplicated or over the error limit.
    pub fn add(&mut self, diag: Diagnostic) -> bool {
        let is_error = diag.is_error();

        if self.is_gagged() {
            if is_error {
                self.gagged_errors += 1;
            }
            return false;
        }

        if is_error && self.limit_reached() {
            if !self.limit_reported {
                self.limit_reported = true;
                let span = diag.primary_span().unwrap_or_default();
                self.diagnostics
                    .push(too_many_errors(self.config.error_limit, span));
            }
            return false;
        }

        if is_error {
            let key = (diag.primary_span(), message_prefix_hash(&diag.message));
            if self.config.deduplicate && self.last_error == Some(key) {
                return false;
            }
            self.last_error = Some(key);
            self.error_count += 1;
        }

        self.diagnostics.push(diag);
        true
    }

    /// Open a gagged region.
    pub fn push_gag(&mut self) -> GagMark {
        self.gag_depth += 1;
        GagMark {
            gagged_before: self.gagged_errors,
        }
    }

    /// Close a gagged region, returning how many errors it swallowed.
    pub fn pop_gag(&mut self, mark: GagMark) -> usize {
        self.gag_depth = self.gag_depth.saturating_sub(1);
        self.gagged_errors - mark.gagged_before
    }

    /// Check if errors are currently being gagged.
    #[inline]
    pub fn is_gagged(&self) -> bool {
        self.gag_depth > 0
    }

    /// Total errors swallowed by gags so far.
    pub fn gagged_count(&self) -> usize {
        self.gagged_errors
    }

    /// Check if the error limit has been reached.
    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    /// Get the number of surfaced errors.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Check if any errors were surfaced and get proof if so.
    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    /// Drain the collected diagnostics in emission order.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        self.last_error = None;
        self.limit_reported = false;
        std::mem::take(&mut self.diagnostics)
    }

    /// Get diagnostics without clearing the queue.
    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }
}

/// The diagnostic queued when the error limit is first hit.
#[cold]
fn too_many_errors(limit: usize, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9002)
        .with_message(format!("aborting due to {limit} previous errors"))
        .with_label(span, "error limit reached here")
}

#[cfg(test)]
mod tests;
