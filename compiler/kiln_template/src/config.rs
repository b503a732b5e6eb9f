//! Engine configuration.

use kiln_diagnostic::DiagnosticConfig;

/// Maximum instantiation nesting before the engine gives up.
pub const DEFAULT_RECURSION_LIMIT: u32 = 500;

/// Lines of "instantiated from here" shown before the trace is elided.
pub const DEFAULT_TRACE_MAX_SHOWN: usize = 6;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub recursion_limit: u32,
    pub trace_max_shown: usize,
    pub diagnostics: DiagnosticConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            trace_max_shown: DEFAULT_TRACE_MAX_SHOWN,
            diagnostics: DiagnosticConfig::default(),
        }
    }
}

impl EngineConfig {
    /// No error limit and a full trace. For tests and verbose runs.
    pub fn unlimited() -> Self {
        EngineConfig {
            trace_max_shown: usize::MAX,
            diagnostics: DiagnosticConfig::unlimited(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    #[must_use]
    pub fn with_trace_max_shown(mut self, max: usize) -> Self {
        self.trace_max_shown = max;
        self
    }
}
