//! Template parameters.
//!
//! Five kinds: type, `this`, value, alias and tuple. Each may carry a
//! specialization pattern and a default; the tuple kind carries neither and
//! must come last.

use kiln_ir::{Name, Span};
use smallvec::SmallVec;

use crate::argument::{Argument, Constant, Value};
use crate::display::Printer;
use crate::ids::{DeclId, ExprId, ParamIdx, Placeholder, ScopeId, SymbolId};
use crate::semantic::{Semantic, SemanticFailure};
use crate::ty::{Dim, TemplateRef, Type};


#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeParam {
    pub spec: Option<Type>,
    pub default: Option<Type>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueParam {
    /// Declared type; may mention earlier parameters.
    pub ty: Type,
    pub spec: Option<ExprId>,
    pub default: Option<ExprId>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AliasParam {
    /// The aliased symbol's type must match this pattern.
    pub spec_type: Option<Type>,
    /// The aliased symbol must be exactly this one.
    pub spec_alias: Option<SymbolId>,
    pub default: Option<SymbolId>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    Type(TypeParam),
    /// Bound from the receiver type of a member call.
    This(TypeParam),
    Value(ValueParam),
    Alias(AliasParam),
    Tuple,
}

/// Borrowed view of a parameter's specialization.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Specialization<'a> {
    Type(&'a Type),
    Value(ExprId),
    Alias(SymbolId),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateParam {
    pub name: Name,
    pub span: Span,
    /// Set when an earlier parameter's specialization mentions this one.
    /// Computed by the engine at declaration time.
    pub dependent: bool,
    pub kind: ParamKind,
}

impl TemplateParam {
    fn with_kind(name: Name, kind: ParamKind) -> Self {
        TemplateParam {
            name,
            span: Span::DUMMY,
            dependent: false,
            kind,
        }
    }

    pub fn ty(name: Name) -> Self {
        Self::with_kind(name, ParamKind::Type(TypeParam::default()))
    }

    pub fn this(name: Name) -> Self {
        Self::with_kind(name, ParamKind::This(TypeParam::default()))
    }

    pub fn value(name: Name, ty: Type) -> Self {
        Self::with_kind(
            name,
            ParamKind::Value(ValueParam {
                ty,
                spec: None,
                default: None,
            }),
        )
    }

    pub fn alias(name: Name) -> Self {
        Self::with_kind(name, ParamKind::Alias(AliasParam::default()))
    }

    pub fn tuple(name: Name) -> Self {
        Self::with_kind(name, ParamKind::Tuple)
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Set the type pattern of a type, `this` or alias parameter.
    #[must_use]
    pub fn with_spec_type(mut self, pattern: Type) -> Self {
        match &mut self.kind {
            ParamKind::Type(p) | ParamKind::This(p) => p.spec = Some(pattern),
            ParamKind::Alias(p) => p.spec_type = Some(pattern),
            ParamKind::Value(_) | ParamKind::Tuple => {}
        }
        self
    }

    #[must_use]
    pub fn with_default_type(mut self, default: Type) -> Self {
        if let ParamKind::Type(p) | ParamKind::This(p) = &mut self.kind {
            p.default = Some(default);
        }
        self
    }

    #[must_use]
    pub fn with_spec_value(mut self, expr: ExprId) -> Self {
        if let ParamKind::Value(p) = &mut self.kind {
            p.spec = Some(expr);
        }
        self
    }

    #[must_use]
    pub fn with_default_value(mut self, expr: ExprId) -> Self {
        if let ParamKind::Value(p) = &mut self.kind {
            p.default = Some(expr);
        }
        self
    }

    #[must_use]
    pub fn with_spec_alias(mut self, symbol: SymbolId) -> Self {
        if let ParamKind::Alias(p) = &mut self.kind {
            p.spec_alias = Some(symbol);
        }
        self
    }

    #[must_use]
    pub fn with_default_alias(mut self, symbol: SymbolId) -> Self {
        if let ParamKind::Alias(p) = &mut self.kind {
            p.default = Some(symbol);
        }
        self
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, ParamKind::Tuple)
    }

    pub fn is_this(&self) -> bool {
        matches!(self.kind, ParamKind::This(_))
    }

    pub fn specialization(&self) -> Option<Specialization<'_>> {
        match &self.kind {
            ParamKind::Type(p) | ParamKind::This(p) => p.spec.as_ref().map(Specialization::Type),
            ParamKind::Value(p) => p.spec.map(Specialization::Value),
            ParamKind::Alias(p) => p
                .spec_alias
                .map(Specialization::Alias)
                .or_else(|| p.spec_type.as_ref().map(Specialization::Type)),
            ParamKind::Tuple => None,
        }
    }

    pub fn has_default(&self) -> bool {
        match &self.kind {
            ParamKind::Type(p) | ParamKind::This(p) => p.default.is_some(),
            ParamKind::Value(p) => p.default.is_some(),
            ParamKind::Alias(p) => p.default.is_some(),
            ParamKind::Tuple => false,
        }
    }

    /// Parameters mentioned by this parameter's type patterns.
    pub fn pattern_refs(&self) -> SmallVec<[ParamIdx; 4]> {
        let mut refs = SmallVec::new();
        match &self.kind {
            ParamKind::Type(p) | ParamKind::This(p) => {
                if let Some(spec) = &p.spec {
                    spec.param_refs(&mut refs);
                }
            }
            ParamKind::Alias(p) => {
                if let Some(spec) = &p.spec_type {
                    spec.param_refs(&mut refs);
                }
            }
            ParamKind::Value(p) => p.ty.param_refs(&mut refs),
            ParamKind::Tuple => {}
        }
        refs
    }

    /// The default argument, with already-deduced parameters substituted.
    ///
    /// `Ok(None)` when there is no default or it still mentions an unbound
    /// parameter.
    pub fn default_arg<S: Semantic + ?Sized>(
        &self,
        sema: &mut S,
        scope: ScopeId,
        bindings: &[Option<Argument>],
    ) -> Result<Option<Argument>, SemanticFailure> {
        Ok(match &self.kind {
            ParamKind::Type(p) | ParamKind::This(p) => p
                .default
                .as_ref()
                .map(|ty| ty.substitute(bindings))
                .filter(|ty| !ty.has_params())
                .map(Argument::Type),
            ParamKind::Value(p) => match p.default {
                Some(expr) => Some(Argument::Value(sema.evaluate(expr, scope)?)),
                None => None,
            },
            ParamKind::Alias(p) => p.default.map(|sym| Argument::Alias(sema.canonical_symbol(sym))),
            ParamKind::Tuple => None,
        })
    }

    /// Make the bound value visible under this parameter's name.
    pub fn declare<S: Semantic + ?Sized>(&self, sema: &mut S, scope: ScopeId, value: &Argument) {
        sema.declare_symbol(scope, self.name, value);
    }

    /// `T : X!U = int` form, for candidate lists.
    pub fn describe(&self, printer: &Printer<'_>) -> String {
        printer.param(self)
    }

    /// The argument the ranker feeds to a rival declaration for this
    /// parameter. `spec_value` is the parameter's evaluated value
    /// specialization, when it has one.
    pub fn dummy_arg(&self, decl: DeclId, index: ParamIdx, spec_value: Option<Value>) -> Argument {
        let placeholder = Placeholder { decl, param: index };
        match &self.kind {
            ParamKind::Type(p) | ParamKind::This(p) => Argument::Type(
                p.spec
                    .as_ref()
                    .map_or(Type::Placeholder(placeholder), |spec| with_placeholders(spec, decl)),
            ),
            ParamKind::Value(p) => Argument::Value(spec_value.unwrap_or_else(|| Value {
                ty: with_placeholders(&p.ty, decl),
                constant: Constant::Opaque(placeholder),
            })),
            ParamKind::Alias(p) => Argument::Alias(
                p.spec_alias
                    .unwrap_or_else(|| SymbolId::placeholder(placeholder)),
            ),
            ParamKind::Tuple => Argument::tuple(Vec::new()),
        }
    }
}

/// Replace every parameter reference in `pattern` with an opaque
/// placeholder owned by `decl`.
pub fn with_placeholders(pattern: &Type, decl: DeclId) -> Type {
    let stand_in = |param: ParamIdx| Placeholder { decl, param };
    match pattern {
        Type::Param(idx) => Type::Placeholder(stand_in(*idx)),
        Type::Const(inner) => Type::constant(with_placeholders(inner, decl)),
        Type::Pointer(inner) => Type::pointer(with_placeholders(inner, decl)),
        Type::Array(inner) => Type::array(with_placeholders(inner, decl)),
        Type::StaticArray(inner, dim) => {
            let dim = match dim {
                Dim::Param(idx) => Dim::Opaque(stand_in(*idx)),
                other => *other,
            };
            Type::static_array(with_placeholders(inner, decl), dim)
        }
        Type::Instance(inst) => {
            let template = match inst.template {
                TemplateRef::Param(idx) => {
                    TemplateRef::Symbol(SymbolId::placeholder(stand_in(idx)))
                }
                symbol @ TemplateRef::Symbol(_) => symbol,
            };
            let args = inst
                .args
                .iter()
                .map(|arg| match arg {
                    Argument::Type(ty) => Argument::Type(with_placeholders(ty, decl)),
                    other => other.clone(),
                })
                .collect();
            Type::instance(template, args)
        }
        Type::Basic(_) | Type::Named(_) | Type::Placeholder(_) | Type::Error => pattern.clone(),
    }
}
