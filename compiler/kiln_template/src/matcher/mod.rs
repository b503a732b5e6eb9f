//! Matching an argument list against one declaration.
//!
//! Parameters are visited left to right. Each consumes the next argument
//! (a sequence consumes the rest), falls back to its default, or is left
//! to a binding made by an earlier specialization. The match level of the
//! whole declaration is the weakest level of any parameter. The constraint
//! is checked last, once every parameter is bound.

mod deduce;

use std::fmt;

use kiln_ir::StringInterner;
use thiserror::Error;

use crate::argument::{Argument, Value};
use crate::decl::TemplateDecl;
use crate::ids::{DeclId, ExprId, ParamIdx, ScopeId};
use crate::param::{AliasParam, ParamKind, TemplateParam, TypeParam, ValueParam};
use crate::semantic::{Semantic, SemanticFailure};
use crate::ty::Type;

pub(crate) use deduce::Deducer;


/// How well an argument list fits a declaration. Ordered weakest first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MatchLevel {
    NoMatch,
    /// Needed an implicit conversion.
    Convert,
    /// Needed a const conversion.
    Constant,
    Exact,
}

impl fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchLevel::NoMatch => "no match",
            MatchLevel::Convert => "match with conversions",
            MatchLevel::Constant => "match with const conversion",
            MatchLevel::Exact => "exact match",
        })
    }
}

/// Successful match: the level and one argument per parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deduction {
    pub level: MatchLevel,
    pub args: Vec<Argument>,
}

/// Why a declaration rejected an argument list.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Rejection {
    #[error("expected at most {expected} argument(s), found {found}")]
    TooManyArguments { expected: usize, found: usize },
    #[error("argument for parameter #{} does not match", .param.raw())]
    Mismatch { param: ParamIdx },
    #[error("parameter #{} could not be deduced", .param.raw())]
    Unbound { param: ParamIdx },
    #[error("default for parameter #{} failed: {failure}", .param.raw())]
    Default {
        param: ParamIdx,
        failure: SemanticFailure,
    },
    #[error("constraint not satisfied")]
    Constraint { failure: Option<SemanticFailure> },
}

impl Rejection {
    /// Human-readable reason naming the parameter.
    pub fn describe(&self, decl: &TemplateDecl, interner: &StringInterner) -> String {
        let param_name = |idx: ParamIdx| {
            decl.param(idx)
                .map_or("?", |p| interner.lookup(p.name))
                .to_string()
        };
        match self {
            Rejection::TooManyArguments { .. } => self.to_string(),
            Rejection::Mismatch { param } => {
                format!("argument for `{}` does not match", param_name(*param))
            }
            Rejection::Unbound { param } => {
                format!("could not deduce `{}`", param_name(*param))
            }
            Rejection::Default { param, failure } => {
                format!("default for `{}` failed: {failure}", param_name(*param))
            }
            Rejection::Constraint { failure: Some(f) } => {
                format!("constraint could not be evaluated: {f}")
            }
            Rejection::Constraint { failure: None } => self.to_string(),
        }
    }

    /// Kind or count problem rather than a failed deduction.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Rejection::TooManyArguments { .. } | Rejection::Unbound { .. }
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchMode {
    /// A real request: the constraint is evaluated.
    Instantiate,
    /// Ranking with placeholder arguments: the constraint is skipped.
    Rank,
}

/// Match resolved `args` (and an optional receiver for a `this` parameter)
/// against `decl`.
pub fn match_declaration<S: Semantic + ?Sized>(
    sema: &mut S,
    decl: &TemplateDecl,
    id: DeclId,
    args: &[Argument],
    receiver: Option<&Type>,
    mode: MatchMode,
) -> Result<Deduction, Rejection> {
    let mut matcher = Matcher {
        sema,
        decl,
        bindings: vec![None; decl.params.len()],
    };
    let result = matcher.run(args, receiver, mode);
    match &result {
        Ok(d) => tracing::trace!(decl = id.raw(), level = ?d.level, "candidate matched"),
        Err(why) => tracing::trace!(decl = id.raw(), %why, "candidate rejected"),
    }
    result
}

struct Matcher<'a, S: ?Sized> {
    sema: &'a mut S,
    decl: &'a TemplateDecl,
    bindings: Vec<Option<Argument>>,
}

impl<S: Semantic + ?Sized> Matcher<'_, S> {
    fn run(
        &mut self,
        args: &[Argument],
        receiver: Option<&Type>,
        mode: MatchMode,
    ) -> Result<Deduction, Rejection> {
        let decl = self.decl;
        let mut level = MatchLevel::Exact;
        let mut cursor = 0;

        for (i, param) in decl.params.iter().enumerate() {
            let idx = ParamIdx::from_usize(i);
            let m = match &param.kind {
                ParamKind::Tuple => {
                    let rest = args.get(cursor..).unwrap_or(&[]);
                    cursor = args.len();
                    self.match_tuple(idx, rest)
                }
                ParamKind::This(_) => match receiver {
                    Some(ty) => self.match_arg(idx, param, &Argument::Type(ty.clone())),
                    None => self.match_missing(idx, param)?,
                },
                _ => match args.get(cursor) {
                    Some(arg) => {
                        cursor += 1;
                        self.match_arg(idx, param, arg)
                    }
                    None => self.match_missing(idx, param)?,
                },
            };
            if m == MatchLevel::NoMatch {
                return Err(Rejection::Mismatch { param: idx });
            }
            level = level.min(m);
        }

        if cursor < args.len() {
            return Err(Rejection::TooManyArguments {
                expected: decl.params.iter().filter(|p| !p.is_this()).count(),
                found: args.len(),
            });
        }

        let args = std::mem::take(&mut self.bindings)
            .into_iter()
            .enumerate()
            .map(|(i, b)| {
                b.ok_or(Rejection::Unbound {
                    param: ParamIdx::from_usize(i),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if mode == MatchMode::Instantiate {
            if let Some(constraint) = decl.constraint {
                self.bindings = args.iter().cloned().map(Some).collect();
                self.check_constraint(constraint)?;
            }
        }
        Ok(Deduction { level, args })
    }

    /// A parameter with no explicit argument.
    fn match_missing(&mut self, idx: ParamIdx, param: &TemplateParam) -> Result<MatchLevel, Rejection> {
        if self.bindings[idx.index()].is_some() {
            // pinned by an earlier specialization
            return Ok(MatchLevel::Exact);
        }
        if !param.has_default() {
            return Err(Rejection::Unbound { param: idx });
        }
        let arg = self.default_arg(idx, param)?;
        Ok(self.match_arg(idx, param, &arg))
    }

    fn default_arg(&mut self, idx: ParamIdx, param: &TemplateParam) -> Result<Argument, Rejection> {
        let scope = self.param_scope();
        match param.default_arg(&mut *self.sema, scope, &self.bindings) {
            Ok(Some(arg)) => Ok(arg),
            Ok(None) => Err(Rejection::Unbound { param: idx }),
            Err(failure) => Err(Rejection::Default { param: idx, failure }),
        }
    }

    fn match_arg(&mut self, idx: ParamIdx, param: &TemplateParam, arg: &Argument) -> MatchLevel {
        match &param.kind {
            ParamKind::Type(p) | ParamKind::This(p) => self.match_type(idx, param, p, arg),
            ParamKind::Value(p) => self.match_value(idx, p, arg),
            ParamKind::Alias(p) => self.match_alias(idx, p, arg),
            ParamKind::Tuple => self.match_tuple(idx, std::slice::from_ref(arg)),
        }
    }

    fn match_type(
        &mut self,
        idx: ParamIdx,
        param: &TemplateParam,
        p: &TypeParam,
        arg: &Argument,
    ) -> MatchLevel {
        let Argument::Type(ty) = arg else {
            return MatchLevel::NoMatch;
        };
        let mut level = MatchLevel::Exact;
        let mut value = ty.clone();
        if let Some(spec) = &p.spec {
            let m = Deducer::new(&self.decl.params, &mut self.bindings).deduce_type(ty, spec);
            if m == MatchLevel::NoMatch {
                return m;
            }
            // a spec that pins later parameters defers precision to them
            let pins_later = param.pattern_refs().iter().any(|r| *r > idx);
            level = if pins_later { MatchLevel::Exact } else { m };
            if let Some(Argument::Type(own)) = &self.bindings[idx.index()] {
                value = own.clone();
            }
        }
        level.min(deduce::bind(&mut self.bindings, idx, Argument::Type(value)))
    }

    fn match_value(&mut self, idx: ParamIdx, p: &ValueParam, arg: &Argument) -> MatchLevel {
        let Argument::Value(v) = arg else {
            return MatchLevel::NoMatch;
        };
        let declared = p.ty.substitute(&self.bindings);
        if declared.has_params() {
            return MatchLevel::NoMatch;
        }
        let level = if v.ty == declared {
            MatchLevel::Exact
        } else {
            self.sema.implicit_conversion(&v.ty, &declared)
        };
        if level == MatchLevel::NoMatch {
            return level;
        }
        let converted = Value::new(declared, v.constant.clone());

        if let Some(spec) = p.spec {
            let scope = self.param_scope();
            match self.sema.evaluate(spec, scope) {
                Ok(expected) if expected.constant == converted.constant => {}
                _ => return MatchLevel::NoMatch,
            }
        }
        level.min(deduce::bind(&mut self.bindings, idx, Argument::Value(converted)))
    }

    fn match_alias(&mut self, idx: ParamIdx, p: &AliasParam, arg: &Argument) -> MatchLevel {
        let Argument::Alias(sym) = arg else {
            return MatchLevel::NoMatch;
        };
        if let Some(spec) = p.spec_alias {
            if self.sema.canonical_symbol(spec) != *sym {
                return MatchLevel::NoMatch;
            }
        }
        if let Some(pattern) = &p.spec_type {
            let sym_ty = if sym.is_placeholder() {
                None
            } else {
                self.sema.symbol_type(*sym)
            };
            let Some(sym_ty) = sym_ty else {
                return MatchLevel::NoMatch;
            };
            let m = Deducer::new(&self.decl.params, &mut self.bindings).deduce_type(&sym_ty, pattern);
            if m == MatchLevel::NoMatch {
                return m;
            }
        }
        deduce::bind(&mut self.bindings, idx, Argument::Alias(*sym))
    }

    fn match_tuple(&mut self, idx: ParamIdx, rest: &[Argument]) -> MatchLevel {
        if rest.is_empty() && self.bindings[idx.index()].is_some() {
            return MatchLevel::Exact;
        }
        deduce::bind(&mut self.bindings, idx, Argument::tuple(rest.to_vec()))
    }

    fn check_constraint(&mut self, constraint: ExprId) -> Result<(), Rejection> {
        let scope = self.param_scope();
        match self.sema.evaluate(constraint, scope) {
            Ok(value) => match value.as_bool() {
                Some(true) => Ok(()),
                Some(false) => Err(Rejection::Constraint { failure: None }),
                None => Err(Rejection::Constraint {
                    failure: Some(SemanticFailure::new(
                        "constraint is not a boolean",
                        self.decl.span,
                    )),
                }),
            },
            Err(failure) => Err(Rejection::Constraint {
                failure: Some(failure),
            }),
        }
    }

    /// A scope holding every parameter bound so far.
    fn param_scope(&mut self) -> ScopeId {
        let scope = self.sema.open_scope(self.decl.scope);
        for (param, bound) in self.decl.params.iter().zip(&self.bindings) {
            if let Some(arg) = bound {
                param.declare(&mut *self.sema, scope, arg);
            }
        }
        scope
    }
}
