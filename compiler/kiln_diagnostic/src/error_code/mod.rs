//! Error codes for template diagnostics.
//!
//! Each code is a stable identifier (e.g. `E4002`). The first digit names
//! the compiler phase: E4xxx belongs to template instantiation, E9xxx to
//! internal limits.

use std::fmt;

/// Error codes for all template instantiation diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Wrong number or kind of template arguments
    E4001,
    /// No overload of the template matches the arguments
    E4002,
    /// More than one equally specialized overload matches
    E4003,
    /// Template constraint evaluated to false
    E4004,
    /// Template instantiates itself with unchanged arguments
    E4005,
    /// Instantiation nesting exceeded the recursion limit
    E4006,
    /// Member elaboration of an instance failed
    E4007,
    /// Mixin-only template used as a plain instance
    E4008,
    /// Argument, default or specialization could not be evaluated
    E4009,
    /// Malformed template parameter list
    E4010,

    /// Too many errors
    E9002,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::E4001,
        ErrorCode::E4002,
        ErrorCode::E4003,
        ErrorCode::E4004,
        ErrorCode::E4005,
        ErrorCode::E4006,
        ErrorCode::E4007,
        ErrorCode::E4008,
        ErrorCode::E4009,
        ErrorCode::E4010,
        ErrorCode::E9002,
    ];

    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E4004 => "E4004",
            ErrorCode::E4005 => "E4005",
            ErrorCode::E4006 => "E4006",
            ErrorCode::E4007 => "E4007",
            ErrorCode::E4008 => "E4008",
            ErrorCode::E4009 => "E4009",
            ErrorCode::E4010 => "E4010",
            ErrorCode::E9002 => "E9002",
        }
    }

    /// Short description used by `--explain` style lookups.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E4001 => "template argument mismatch",
            ErrorCode::E4002 => "no matching template overload",
            ErrorCode::E4003 => "ambiguous template instance",
            ErrorCode::E4004 => "template constraint failed",
            ErrorCode::E4005 => "recursive template expansion",
            ErrorCode::E4006 => "template nesting limit exceeded",
            ErrorCode::E4007 => "template instance has errors",
            ErrorCode::E4008 => "mixin template used as instance",
            ErrorCode::E4009 => "cannot evaluate template argument",
            ErrorCode::E4010 => "invalid template parameter list",
            ErrorCode::E9002 => "too many errors",
        }
    }

    /// Check if this code reports a recursion problem (self-reference or depth).
    pub fn is_recursion_error(&self) -> bool {
        matches!(self, ErrorCode::E4005 | ErrorCode::E4006)
    }

    /// Check if this code comes from overload selection.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E4001 | ErrorCode::E4002 | ErrorCode::E4003 | ErrorCode::E4004
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an error code string like `"E4002"`. Case-insensitive.
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}
