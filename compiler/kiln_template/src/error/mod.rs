//! Errors raised by the engine.
//!
//! Messages are rendered eagerly (template names need the semantic service
//! to print) so errors stay plain data that can be cloned into diagnostics.

use kiln_diagnostic::{Diagnostic, ErrorCode};
use kiln_ir::Span;
use thiserror::Error;

use crate::decl::ParamListError;
use crate::ids::InstanceId;
use crate::semantic::SemanticFailure;

#[cfg(test)]
mod tests;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TemplateError {
    #[error("template `{template}` cannot be instantiated as `{instance}`: {reason}")]
    ArgumentMismatch {
        template: String,
        instance: String,
        reason: String,
        span: Span,
    },

    #[error("`{instance}` does not match any template declaration")]
    NoMatchingOverload {
        instance: String,
        candidates: Vec<String>,
        span: Span,
    },

    #[error("`{instance}` matches more than one template declaration: `{first}` and `{second}`")]
    AmbiguousOverload {
        instance: String,
        first: String,
        second: String,
        /// Where `first` and `second` are declared.
        declared: [Span; 2],
        span: Span,
    },

    #[error("template instance `{instance}` does not satisfy the constraint of `{template}`")]
    ConstraintFailed {
        instance: String,
        template: String,
        reason: Option<String>,
        span: Span,
    },

    #[error("recursive template expansion for `{instance}`")]
    RecursiveExpansion { instance: String, span: Span },

    #[error(
        "template instance `{instance}` recursive expansion exceeded allowed nesting limit of {limit}"
    )]
    NestingDepthExceeded {
        instance: String,
        limit: u32,
        span: Span,
    },

    #[error("template instance `{name}` error instantiating")]
    MemberElaborationFailed {
        instance: InstanceId,
        name: String,
        reason: Option<String>,
        span: Span,
    },

    #[error("mixin template `{template}` cannot be instantiated as a plain instance")]
    MixinOnly { template: String, span: Span },

    #[error("cannot resolve template argument: {0}")]
    Semantic(#[from] SemanticFailure),

    #[error("invalid parameter list for template `{template}`: {reason}")]
    InvalidParameterList {
        template: String,
        #[source]
        reason: ParamListError,
        span: Span,
    },
}

impl TemplateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TemplateError::ArgumentMismatch { .. } => ErrorCode::E4001,
            TemplateError::NoMatchingOverload { .. } => ErrorCode::E4002,
            TemplateError::AmbiguousOverload { .. } => ErrorCode::E4003,
            TemplateError::ConstraintFailed { .. } => ErrorCode::E4004,
            TemplateError::RecursiveExpansion { .. } => ErrorCode::E4005,
            TemplateError::NestingDepthExceeded { .. } => ErrorCode::E4006,
            TemplateError::MemberElaborationFailed { .. } => ErrorCode::E4007,
            TemplateError::MixinOnly { .. } => ErrorCode::E4008,
            TemplateError::Semantic(_) => ErrorCode::E4009,
            TemplateError::InvalidParameterList { .. } => ErrorCode::E4010,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TemplateError::ArgumentMismatch { span, .. }
            | TemplateError::NoMatchingOverload { span, .. }
            | TemplateError::AmbiguousOverload { span, .. }
            | TemplateError::ConstraintFailed { span, .. }
            | TemplateError::RecursiveExpansion { span, .. }
            | TemplateError::NestingDepthExceeded { span, .. }
            | TemplateError::MemberElaborationFailed { span, .. }
            | TemplateError::MixinOnly { span, .. }
            | TemplateError::InvalidParameterList { span, .. } => *span,
            TemplateError::Semantic(failure) => failure.span,
        }
    }

    /// The failed instance, for errors that have one.
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            TemplateError::MemberElaborationFailed { instance, .. } => Some(*instance),
            _ => None,
        }
    }

    /// Build a diagnostic, appending `trace` as notes.
    pub fn to_diagnostic(&self, trace: &[String]) -> Diagnostic {
        let label = match self {
            TemplateError::ArgumentMismatch { .. } => "wrong template arguments",
            TemplateError::NoMatchingOverload { .. } => "no matching declaration",
            TemplateError::AmbiguousOverload { .. } => "ambiguous instance",
            TemplateError::ConstraintFailed { .. } => "constraint failed",
            TemplateError::RecursiveExpansion { .. } => "expands to itself",
            TemplateError::NestingDepthExceeded { .. } => "nested too deeply",
            TemplateError::MemberElaborationFailed { .. } => "instantiated here",
            TemplateError::MixinOnly { .. } => "used as a plain instance",
            TemplateError::Semantic(_) => "cannot be evaluated",
            TemplateError::InvalidParameterList { .. } => "declared here",
        };
        let mut diag = Diagnostic::error(self.code())
            .with_message(self.to_string())
            .with_label(self.span(), label);

        match self {
            TemplateError::AmbiguousOverload { declared, .. } => {
                for decl_span in declared {
                    diag = diag.with_secondary_label(*decl_span, "candidate declared here");
                }
            }
            TemplateError::NoMatchingOverload { candidates, .. } => {
                diag = diag.with_notes(candidates.iter().map(|c| format!("candidate: {c}")));
            }
            TemplateError::ConstraintFailed {
                reason: Some(reason),
                ..
            }
            | TemplateError::MemberElaborationFailed {
                reason: Some(reason),
                ..
            } => {
                diag = diag.with_note(reason.clone());
            }
            _ => {}
        }
        diag.with_notes(trace.iter().cloned())
    }
}
