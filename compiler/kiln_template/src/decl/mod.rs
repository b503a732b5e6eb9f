//! Template declarations.

use bitflags::bitflags;
use kiln_ir::{Name, Span};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::cache::InstanceCache;
use crate::ids::{DeclId, ExprId, ModuleId, ParamIdx, ScopeId, SymbolId};
use crate::param::TemplateParam;


bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct DeclFlags: u8 {
        /// Can only be instantiated by a mixin into an aggregate.
        const MIXIN_ONLY = 1 << 0;
        /// Synthesized from a function or aggregate with template parameters.
        const LITERAL = 1 << 1;
        /// Instances need no enclosing `this`.
        const STATIC = 1 << 2;
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Visibility {
    Private,
    Package,
    Protected,
    #[default]
    Public,
    Export,
}

/// Reasons a parameter list is rejected at declaration time.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParamListError {
    #[error("sequence parameter must be the last parameter")]
    TupleNotLast,
    #[error("parameter #{0} is declared more than once")]
    DuplicateName(usize),
    #[error("specialization of parameter #{param} mentions unknown parameter #{target}")]
    UnknownParam { param: usize, target: u32 },
    #[error("`this` parameter must be the first parameter")]
    ThisNotFirst,
}

/// A template declaration: parameters, optional constraint, and the
/// members each instance elaborates.
#[derive(Debug)]
pub struct TemplateDecl {
    pub name: Name,
    pub span: Span,
    /// Symbol the declaration is reachable through.
    pub symbol: SymbolId,
    pub module: ModuleId,
    /// Lexical scope of the declaration; parent of every parameter scope.
    pub scope: ScopeId,
    pub params: Vec<TemplateParam>,
    pub constraint: Option<ExprId>,
    /// Set when the body declares exactly one member; eponymous when it
    /// shares the declaration's name.
    pub one_member: Option<Name>,
    pub visibility: Visibility,
    pub flags: DeclFlags,
    pub(crate) next: Option<DeclId>,
    pub(crate) root: Option<DeclId>,
    pub(crate) cache: InstanceCache,
}

impl TemplateDecl {
    pub fn new(name: Name, symbol: SymbolId, module: ModuleId, scope: ScopeId) -> Self {
        TemplateDecl {
            name,
            span: Span::DUMMY,
            symbol,
            module,
            scope,
            params: Vec::new(),
            constraint: None,
            one_member: None,
            visibility: Visibility::Public,
            flags: DeclFlags::empty(),
            next: None,
            root: None,
            cache: InstanceCache::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<TemplateParam>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: ExprId) -> Self {
        self.constraint = Some(constraint);
        self
    }

    #[must_use]
    pub fn with_one_member(mut self, member: Name) -> Self {
        self.one_member = Some(member);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: DeclFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn param(&self, index: ParamIdx) -> Option<&TemplateParam> {
        self.params.get(index.index())
    }

    /// Index of the trailing sequence parameter, if any.
    pub fn variadic(&self) -> Option<ParamIdx> {
        match self.params.last() {
            Some(p) if p.is_tuple() => Some(ParamIdx::from_usize(self.params.len() - 1)),
            _ => None,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic().is_some()
    }

    /// Variadic, and the sequence is not pinned by another parameter.
    pub(crate) fn is_open_variadic(&self) -> bool {
        self.variadic()
            .and_then(|idx| self.param(idx))
            .is_some_and(|p| !p.dependent)
    }

    pub fn is_mixin_only(&self) -> bool {
        self.flags.contains(DeclFlags::MIXIN_ONLY)
    }

    pub fn is_eponymous(&self) -> bool {
        self.one_member == Some(self.name)
    }

    pub fn next(&self) -> Option<DeclId> {
        self.next
    }

    pub fn root(&self) -> Option<DeclId> {
        self.root
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    /// Whether code in `from` may instantiate this declaration.
    pub fn is_visible_from(&self, from: ModuleId) -> bool {
        match self.visibility {
            Visibility::Private => from == self.module,
            Visibility::Package | Visibility::Protected | Visibility::Public | Visibility::Export => {
                true
            }
        }
    }

    /// Check the parameter list and compute each parameter's `dependent`
    /// flag.
    pub(crate) fn finalize(&mut self) -> Result<(), ParamListError> {
        let count = self.params.len();
        let mut seen = FxHashSet::default();
        for (i, param) in self.params.iter().enumerate() {
            if param.is_tuple() && i + 1 != count {
                return Err(ParamListError::TupleNotLast);
            }
            if param.is_this() && i != 0 {
                return Err(ParamListError::ThisNotFirst);
            }
            if !seen.insert(param.name) {
                return Err(ParamListError::DuplicateName(i));
            }
        }

        let mut dependent = vec![false; count];
        for (i, param) in self.params.iter().enumerate() {
            for target in param.pattern_refs() {
                let t = target.index();
                if t >= count {
                    return Err(ParamListError::UnknownParam {
                        param: i,
                        target: target.raw(),
                    });
                }
                // a self-reference (T : T[]) is not a dependency
                if t > i {
                    dependent[t] = true;
                }
            }
        }
        for (param, dep) in self.params.iter_mut().zip(dependent) {
            param.dependent = dep;
        }
        Ok(())
    }
}
