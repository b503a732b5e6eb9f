//! Instantiation requests.

use kiln_ir::Span;

use crate::argument::TemplateArg;
use crate::ids::{DeclId, ModuleId, ScopeId, SymbolId};
use crate::ty::Type;

/// What the requester needs from the instance.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Need {
    /// Fully elaborated members.
    #[default]
    Members,
    /// Only a handle; an instance still in progress will do.
    Reference,
}

/// The aggregate a mixin splices its members into.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MixinTarget {
    pub aggregate: SymbolId,
    /// Member scope of the aggregate.
    pub scope: ScopeId,
}

#[derive(Clone, Debug)]
pub struct Request {
    /// Any declaration of the overload set.
    pub decl: DeclId,
    pub args: Vec<TemplateArg>,
    /// Scope the arguments are written in.
    pub scope: ScopeId,
    pub module: ModuleId,
    pub span: Span,
    pub receiver: Option<Type>,
    pub need: Need,
    pub gagged: bool,
    pub mixin: Option<MixinTarget>,
}

impl Request {
    pub fn new(decl: DeclId, args: Vec<TemplateArg>, scope: ScopeId, module: ModuleId) -> Self {
        Request {
            decl,
            args,
            scope,
            module,
            span: Span::DUMMY,
            receiver: None,
            need: Need::Members,
            gagged: false,
            mixin: None,
        }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: Type) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Only a handle is needed; see [`Need::Reference`].
    #[must_use]
    pub fn reference_only(mut self) -> Self {
        self.need = Need::Reference;
        self
    }

    /// Speculative: failures are counted but not reported.
    #[must_use]
    pub fn gagged(mut self) -> Self {
        self.gagged = true;
        self
    }

    #[must_use]
    pub fn into_mixin(mut self, target: MixinTarget) -> Self {
        self.mixin = Some(target);
        self
    }
}
