//! Template arguments.
//!
//! [`TemplateArg`] is what a call site writes: it may still hold an
//! unevaluated expression or an unresolved alias. [`Argument`] is the
//! resolved form every other part of the engine works with. Resolution
//! happens once per request, before any candidate is matched.

use std::fmt;

use kiln_ir::Name;

use crate::ids::{ExprId, Placeholder, SymbolId};
use crate::ty::Type;


/// A compile-time constant.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Constant {
    Int(i128),
    Bool(bool),
    Char(char),
    Str(Name),
    Null,
    /// Ranking stand-in for a value parameter. Equal only to itself.
    Opaque(Placeholder),
}

/// A typed compile-time value.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Value {
    pub ty: Type,
    pub constant: Constant,
}

impl Value {
    pub fn new(ty: Type, constant: Constant) -> Self {
        Value { ty, constant }
    }

    pub fn int(n: i128) -> Self {
        Value::new(Type::INT, Constant::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Value::new(Type::BOOL, Constant::Bool(b))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.constant {
            Constant::Bool(b) => Some(b),
            _ => None,
        }
    }
}

/// A flat sequence of arguments. Never contains another tuple.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Tuple(Vec<Argument>);

impl Tuple {
    /// Build a tuple, splicing nested tuples in place.
    pub fn new(items: impl IntoIterator<Item = Argument>) -> Self {
        let mut flat = Vec::new();
        for item in items {
            item.flatten_into(&mut flat);
        }
        Tuple(flat)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Argument] {
        &self.0
    }
}

/// A resolved template argument.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Argument {
    Type(Type),
    Value(Value),
    /// Symbolic reference, already canonicalized through any alias chain.
    Alias(SymbolId),
    Tuple(Tuple),
}

/// Coarse kind of an argument, for messages.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArgKind {
    Type,
    Value,
    Alias,
    Tuple,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::Type => "type",
            ArgKind::Value => "value",
            ArgKind::Alias => "symbol",
            ArgKind::Tuple => "sequence",
        })
    }
}

impl Argument {
    pub fn tuple(items: impl IntoIterator<Item = Argument>) -> Argument {
        Argument::Tuple(Tuple::new(items))
    }

    pub fn kind(&self) -> ArgKind {
        match self {
            Argument::Type(_) => ArgKind::Type,
            Argument::Value(_) => ArgKind::Value,
            Argument::Alias(_) => ArgKind::Alias,
            Argument::Tuple(_) => ArgKind::Tuple,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Argument::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// Push this argument onto `out`, splicing tuple elements.
    pub fn flatten_into(self, out: &mut Vec<Argument>) {
        match self {
            Argument::Tuple(tuple) => out.extend(tuple.0),
            other => out.push(other),
        }
    }

    pub fn contains_error(&self) -> bool {
        match self {
            Argument::Type(ty) => ty.contains_error(),
            Argument::Value(value) => value.ty.contains_error(),
            Argument::Alias(_) => false,
            Argument::Tuple(tuple) => tuple.iter().any(Argument::contains_error),
        }
    }
}

impl From<Type> for Argument {
    fn from(ty: Type) -> Self {
        Argument::Type(ty)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

/// An argument as written at an instantiation site.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TemplateArg {
    Type(Type),
    /// Already-folded constant.
    Value(Value),
    /// Expression the semantic service must evaluate.
    Expr(ExprId),
    /// Symbol that may itself be an alias.
    Symbol(SymbolId),
    /// A sequence written in argument position; spliced on resolution.
    Tuple(Vec<TemplateArg>),
}

impl From<Type> for TemplateArg {
    fn from(ty: Type) -> Self {
        TemplateArg::Type(ty)
    }
}

impl From<Value> for TemplateArg {
    fn from(value: Value) -> Self {
        TemplateArg::Value(value)
    }
}

/// Flatten a resolved list so the top level holds no tuples.
pub fn flatten(args: impl IntoIterator<Item = Argument>) -> Vec<Argument> {
    let mut out = Vec::new();
    for arg in args {
        arg.flatten_into(&mut out);
    }
    out
}
