//! The boundary between the engine and the rest of the front end.
//!
//! The engine never evaluates expressions, resolves names or checks
//! members itself. Everything that needs the surrounding compiler goes
//! through [`Semantic`].

use kiln_ir::{Name, Span};
use thiserror::Error;

use crate::argument::{Argument, Value};
use crate::chain::Chain;
use crate::engine::Engine;
use crate::error::TemplateError;
use crate::ids::{ExprId, InstanceId, ScopeId, SymbolId};
use crate::instance::{Member, MemberTable};
use crate::matcher::MatchLevel;
use crate::ty::Type;

/// A failure reported by the semantic service.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Error)]
#[error("{message}")]
pub struct SemanticFailure {
    pub message: String,
    pub span: Span,
}

impl SemanticFailure {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        SemanticFailure {
            message: message.into(),
            span,
        }
    }
}

/// Nested instantiation errors surface to the outer body as failures.
impl From<TemplateError> for SemanticFailure {
    fn from(err: TemplateError) -> Self {
        SemanticFailure::new(err.to_string(), err.span())
    }
}

pub trait Semantic {
    /// Fold `expr` to a constant in `scope`.
    fn evaluate(&mut self, expr: ExprId, scope: ScopeId) -> Result<Value, SemanticFailure>;

    /// Resolve a type written at an instantiation site.
    fn resolve_type(&mut self, ty: &Type, _scope: ScopeId) -> Result<Type, SemanticFailure> {
        Ok(ty.clone())
    }

    /// Open a child scope of `parent`.
    fn open_scope(&mut self, parent: ScopeId) -> ScopeId;

    /// Bind a parameter name to its argument inside `scope`.
    fn declare_symbol(&mut self, scope: ScopeId, name: Name, value: &Argument);

    /// Follow alias chains to the symbol they finally name.
    fn canonical_symbol(&self, symbol: SymbolId) -> SymbolId {
        symbol
    }

    /// The type of a variable or function symbol.
    fn symbol_type(&self, _symbol: SymbolId) -> Option<Type> {
        None
    }

    /// Scope of the function a local symbol lives in.
    fn local_context(&self, _symbol: SymbolId) -> Option<ScopeId> {
        None
    }

    /// How well a value of `from` converts to `to`.
    fn implicit_conversion(&self, from: &Type, to: &Type) -> MatchLevel {
        if from == to {
            MatchLevel::Exact
        } else {
            MatchLevel::NoMatch
        }
    }

    fn symbol_name(&self, symbol: SymbolId) -> Name;

    /// Elaborate the members of a freshly created instance.
    ///
    /// Member bodies may request further instances through `engine`,
    /// passing `chain` along.
    fn elaborate_members(
        &mut self,
        engine: &mut Engine,
        chain: Chain<'_>,
        instance: InstanceId,
    ) -> Result<MemberTable, SemanticFailure>;

    /// Finish work on `instance` once every instance it waited on is done.
    fn resume(&mut self, _engine: &mut Engine, _instance: InstanceId) -> Result<(), SemanticFailure> {
        Ok(())
    }

    /// Splice a mixin member into the target aggregate's scope.
    fn inject_member(&mut self, _target: SymbolId, _member: &Member) {}
}
