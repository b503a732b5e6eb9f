//! Structural deduction of parameter bindings from a type pattern.

use crate::argument::{Argument, Constant, Value};
use crate::ids::ParamIdx;
use crate::param::{ParamKind, TemplateParam};
use crate::stack::ensure_sufficient_stack;
use crate::ty::{Dim, InstanceType, TemplateRef, Type};

use super::MatchLevel;

fn exact_if(same: bool) -> MatchLevel {
    if same {
        MatchLevel::Exact
    } else {
        MatchLevel::NoMatch
    }
}

/// Bind `idx` to `value`, or check it against an existing binding.
pub(crate) fn bind(bindings: &mut [Option<Argument>], idx: ParamIdx, value: Argument) -> MatchLevel {
    let Some(slot) = bindings.get_mut(idx.index()) else {
        return MatchLevel::NoMatch;
    };
    match slot {
        Some(existing) => exact_if(*existing == value),
        None => {
            *slot = Some(value);
            MatchLevel::Exact
        }
    }
}

pub(crate) struct Deducer<'a> {
    params: &'a [TemplateParam],
    bindings: &'a mut [Option<Argument>],
}

impl<'a> Deducer<'a> {
    pub(crate) fn new(params: &'a [TemplateParam], bindings: &'a mut [Option<Argument>]) -> Self {
        Deducer { params, bindings }
    }

    fn kind(&self, idx: ParamIdx) -> Option<&'a ParamKind> {
        self.params.get(idx.index()).map(|p| &p.kind)
    }

    /// Unify a resolved type with a pattern, binding the pattern's
    /// parameters.
    pub(crate) fn deduce_type(&mut self, arg: &Type, pattern: &Type) -> MatchLevel {
        ensure_sufficient_stack(|| self.deduce_type_inner(arg, pattern))
    }

    fn deduce_type_inner(&mut self, arg: &Type, pattern: &Type) -> MatchLevel {
        match (arg, pattern) {
            (_, Type::Param(idx)) => match self.kind(*idx) {
                Some(ParamKind::Type(_) | ParamKind::This(_)) => {
                    bind(self.bindings, *idx, Argument::Type(arg.clone()))
                }
                _ => MatchLevel::NoMatch,
            },
            (Type::Const(a), Type::Const(p)) => self.deduce_type(a, p),
            (_, Type::Const(_)) => MatchLevel::NoMatch,
            // a const argument still fits a mutable pattern, one level down
            (Type::Const(a), _) => self.deduce_type(a, pattern).min(MatchLevel::Constant),
            (Type::Basic(a), Type::Basic(p)) => exact_if(a == p),
            (Type::Named(a), Type::Named(p)) => exact_if(a == p),
            (Type::Placeholder(a), Type::Placeholder(p)) => exact_if(a == p),
            (Type::Pointer(a), Type::Pointer(p)) | (Type::Array(a), Type::Array(p)) => {
                self.deduce_type(a, p)
            }
            (Type::StaticArray(a, da), Type::StaticArray(p, dp)) => {
                let elem = self.deduce_type(a, p);
                if elem == MatchLevel::NoMatch {
                    return elem;
                }
                elem.min(self.deduce_dim(*da, *dp))
            }
            (Type::Instance(a), Type::Instance(p)) => self.deduce_instance(a, p),
            _ => MatchLevel::NoMatch,
        }
    }

    fn deduce_dim(&mut self, arg: Dim, pattern: Dim) -> MatchLevel {
        match (arg, pattern) {
            (_, Dim::Param(idx)) => {
                let ty = match self.kind(idx) {
                    Some(ParamKind::Value(p)) if !p.ty.has_params() => p.ty.clone(),
                    Some(ParamKind::Value(_)) => Type::ULONG,
                    _ => return MatchLevel::NoMatch,
                };
                let constant = match arg {
                    Dim::Known(n) => Constant::Int(i128::from(n)),
                    Dim::Opaque(p) => Constant::Opaque(p),
                    Dim::Param(_) => return MatchLevel::NoMatch,
                };
                bind(self.bindings, idx, Argument::Value(Value::new(ty, constant)))
            }
            (Dim::Known(a), Dim::Known(p)) => exact_if(a == p),
            (Dim::Opaque(a), Dim::Opaque(p)) => exact_if(a == p),
            _ => MatchLevel::NoMatch,
        }
    }

    fn deduce_instance(&mut self, arg: &InstanceType, pattern: &InstanceType) -> MatchLevel {
        let mut level = match (arg.template, pattern.template) {
            (TemplateRef::Symbol(a), TemplateRef::Symbol(p)) => exact_if(a == p),
            (TemplateRef::Symbol(a), TemplateRef::Param(idx)) => match self.kind(idx) {
                Some(ParamKind::Alias(_)) => bind(self.bindings, idx, Argument::Alias(a)),
                _ => MatchLevel::NoMatch,
            },
            (TemplateRef::Param(_), _) => MatchLevel::NoMatch,
        };
        if level == MatchLevel::NoMatch {
            return level;
        }

        for (k, pat) in pattern.args.iter().enumerate() {
            if let Argument::Type(Type::Param(idx)) = pat {
                if matches!(self.kind(*idx), Some(ParamKind::Tuple)) {
                    // the sequence soaks up the rest and must be last
                    if k + 1 != pattern.args.len() {
                        return MatchLevel::NoMatch;
                    }
                    let rest = arg.args.get(k..).unwrap_or(&[]);
                    return level.min(bind(self.bindings, *idx, Argument::tuple(rest.to_vec())));
                }
            }
            let Some(a) = arg.args.get(k) else {
                return MatchLevel::NoMatch;
            };
            level = level.min(self.deduce_arg(a, pat));
            if level == MatchLevel::NoMatch {
                return level;
            }
        }
        if arg.args.len() == pattern.args.len() {
            level
        } else {
            MatchLevel::NoMatch
        }
    }

    fn deduce_arg(&mut self, arg: &Argument, pattern: &Argument) -> MatchLevel {
        match (arg, pattern) {
            (_, Argument::Type(Type::Param(idx))) => match (self.kind(*idx), arg) {
                (Some(ParamKind::Type(_) | ParamKind::This(_)), Argument::Type(_))
                | (Some(ParamKind::Value(_)), Argument::Value(_))
                | (Some(ParamKind::Alias(_)), Argument::Alias(_)) => {
                    bind(self.bindings, *idx, arg.clone())
                }
                _ => MatchLevel::NoMatch,
            },
            (Argument::Type(a), Argument::Type(p)) => self.deduce_type(a, p),
            (Argument::Value(a), Argument::Value(p)) => exact_if(a.constant == p.constant),
            (Argument::Alias(a), Argument::Alias(p)) => exact_if(a == p),
            (Argument::Tuple(a), Argument::Tuple(p)) => exact_if(a == p),
            _ => MatchLevel::NoMatch,
        }
    }
}
