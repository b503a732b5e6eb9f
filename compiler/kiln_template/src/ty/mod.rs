//! The type language seen by the template engine.
//!
//! Types appear in two roles. As *arguments* they are fully resolved and
//! never contain [`Type::Param`]. As *patterns* (specializations, defaults,
//! declared value-parameter types) they may mention the declaration's own
//! parameters, which deduction binds.

use smallvec::SmallVec;

use crate::argument::{Argument, Constant, Value};
use crate::ids::{ParamIdx, Placeholder, SymbolId};


/// Built-in scalar types.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BasicType {
    Void,
    Bool,
    Byte,
    Ubyte,
    Short,
    Ushort,
    Int,
    Uint,
    Long,
    Ulong,
    Char,
    Float,
    Double,
}

impl BasicType {
    pub fn name(self) -> &'static str {
        match self {
            BasicType::Void => "void",
            BasicType::Bool => "bool",
            BasicType::Byte => "byte",
            BasicType::Ubyte => "ubyte",
            BasicType::Short => "short",
            BasicType::Ushort => "ushort",
            BasicType::Int => "int",
            BasicType::Uint => "uint",
            BasicType::Long => "long",
            BasicType::Ulong => "ulong",
            BasicType::Char => "char",
            BasicType::Float => "float",
            BasicType::Double => "double",
        }
    }

    /// One-letter code used in mangled names.
    pub fn mangle_code(self) -> char {
        match self {
            BasicType::Void => 'v',
            BasicType::Bool => 'b',
            BasicType::Byte => 'g',
            BasicType::Ubyte => 'h',
            BasicType::Short => 's',
            BasicType::Ushort => 't',
            BasicType::Int => 'i',
            BasicType::Uint => 'k',
            BasicType::Long => 'l',
            BasicType::Ulong => 'm',
            BasicType::Char => 'a',
            BasicType::Float => 'f',
            BasicType::Double => 'd',
        }
    }

    /// Size in bytes, as used by mixin layout.
    pub fn size(self) -> u32 {
        match self {
            BasicType::Void => 0,
            BasicType::Bool | BasicType::Byte | BasicType::Ubyte | BasicType::Char => 1,
            BasicType::Short | BasicType::Ushort => 2,
            BasicType::Int | BasicType::Uint | BasicType::Float => 4,
            BasicType::Long | BasicType::Ulong | BasicType::Double => 8,
        }
    }
}

/// Length of a static array.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dim {
    Known(u64),
    /// Bound by a value parameter of the enclosing declaration.
    Param(ParamIdx),
    /// Ranking stand-in for a value parameter.
    Opaque(Placeholder),
}

/// The template named by an instance type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TemplateRef {
    Symbol(SymbolId),
    /// Bound by an alias parameter of the enclosing declaration.
    Param(ParamIdx),
}

/// `Template!(args...)` used as a type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InstanceType {
    pub template: TemplateRef,
    pub args: Vec<Argument>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Type {
    Basic(BasicType),
    /// A user-defined nominal type (struct, class, enum...).
    Named(SymbolId),
    Const(Box<Type>),
    Pointer(Box<Type>),
    /// Dynamic array `T[]`.
    Array(Box<Type>),
    StaticArray(Box<Type>, Dim),
    Instance(Box<InstanceType>),
    /// Reference to a parameter of the enclosing declaration.
    Param(ParamIdx),
    Placeholder(Placeholder),
    /// A type that already failed to resolve. Never cached.
    Error,
}

impl Type {
    pub const INT: Type = Type::Basic(BasicType::Int);
    pub const BOOL: Type = Type::Basic(BasicType::Bool);
    pub const CHAR: Type = Type::Basic(BasicType::Char);
    pub const ULONG: Type = Type::Basic(BasicType::Ulong);

    pub fn constant(inner: Type) -> Type {
        // const(const(T)) is const(T)
        match inner {
            Type::Const(_) => inner,
            other => Type::Const(Box::new(other)),
        }
    }

    pub fn pointer(inner: Type) -> Type {
        Type::Pointer(Box::new(inner))
    }

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn static_array(elem: Type, dim: Dim) -> Type {
        Type::StaticArray(Box::new(elem), dim)
    }

    pub fn instance(template: TemplateRef, args: Vec<Argument>) -> Type {
        Type::Instance(Box::new(InstanceType { template, args }))
    }

    pub fn param(index: u32) -> Type {
        Type::Param(ParamIdx::new(index))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// True if an error type appears anywhere inside.
    pub fn contains_error(&self) -> bool {
        match self {
            Type::Error => true,
            Type::Const(inner)
            | Type::Pointer(inner)
            | Type::Array(inner)
            | Type::StaticArray(inner, _) => inner.contains_error(),
            Type::Instance(inst) => inst.args.iter().any(Argument::contains_error),
            Type::Basic(_) | Type::Named(_) | Type::Param(_) | Type::Placeholder(_) => false,
        }
    }

    /// Strip one level of `const`.
    pub fn unqualified(&self) -> &Type {
        match self {
            Type::Const(inner) => inner,
            other => other,
        }
    }

    /// Whether a value of this type holds a pointer the collector must scan.
    pub fn has_pointers(&self) -> bool {
        match self {
            Type::Pointer(_) | Type::Array(_) | Type::Named(_) | Type::Instance(_) => true,
            Type::Const(inner) | Type::StaticArray(inner, _) => inner.has_pointers(),
            Type::Basic(_) | Type::Param(_) | Type::Placeholder(_) | Type::Error => false,
        }
    }

    /// Collect every parameter this pattern mentions.
    pub fn param_refs(&self, out: &mut SmallVec<[ParamIdx; 4]>) {
        match self {
            Type::Param(idx) => push_unique(out, *idx),
            Type::Const(inner) | Type::Pointer(inner) | Type::Array(inner) => {
                inner.param_refs(out);
            }
            Type::StaticArray(inner, dim) => {
                if let Dim::Param(idx) = dim {
                    push_unique(out, *idx);
                }
                inner.param_refs(out);
            }
            Type::Instance(inst) => {
                if let TemplateRef::Param(idx) = inst.template {
                    push_unique(out, idx);
                }
                for arg in &inst.args {
                    if let Argument::Type(ty) = arg {
                        ty.param_refs(out);
                    }
                }
            }
            Type::Basic(_) | Type::Named(_) | Type::Placeholder(_) | Type::Error => {}
        }
    }

    /// True if this type still mentions declaration parameters.
    pub fn has_params(&self) -> bool {
        let mut refs = SmallVec::new();
        self.param_refs(&mut refs);
        !refs.is_empty()
    }

    /// Replace parameter references with their bindings.
    ///
    /// Unbound references are left in place so the caller can detect them
    /// with [`Type::has_params`].
    pub fn substitute(&self, bindings: &[Option<Argument>]) -> Type {
        let bound = |idx: ParamIdx| bindings.get(idx.index()).and_then(Option::as_ref);
        match self {
            Type::Param(idx) => match bound(*idx) {
                Some(Argument::Type(ty)) => ty.clone(),
                _ => self.clone(),
            },
            Type::Const(inner) => Type::constant(inner.substitute(bindings)),
            Type::Pointer(inner) => Type::pointer(inner.substitute(bindings)),
            Type::Array(inner) => Type::array(inner.substitute(bindings)),
            Type::StaticArray(inner, dim) => {
                let dim = match dim {
                    Dim::Param(idx) => match bound(*idx) {
                        Some(Argument::Value(Value {
                            constant: Constant::Int(n),
                            ..
                        })) => u64::try_from(*n).map_or(*dim, Dim::Known),
                        Some(Argument::Value(Value {
                            constant: Constant::Opaque(p),
                            ..
                        })) => Dim::Opaque(*p),
                        _ => *dim,
                    },
                    other => *other,
                };
                Type::static_array(inner.substitute(bindings), dim)
            }
            Type::Instance(inst) => {
                let template = match inst.template {
                    TemplateRef::Param(idx) => match bound(idx) {
                        Some(Argument::Alias(sym)) => TemplateRef::Symbol(*sym),
                        _ => inst.template,
                    },
                    symbol @ TemplateRef::Symbol(_) => symbol,
                };
                let mut args = Vec::with_capacity(inst.args.len());
                for arg in &inst.args {
                    match arg {
                        // a bare parameter in argument position takes its
                        // binding whatever kind it is; tuples splice
                        Argument::Type(Type::Param(idx)) => match bound(*idx) {
                            Some(Argument::Tuple(tuple)) => args.extend(tuple.iter().cloned()),
                            Some(other) => args.push(other.clone()),
                            None => args.push(arg.clone()),
                        },
                        Argument::Type(ty) => args.push(Argument::Type(ty.substitute(bindings))),
                        other => args.push(other.clone()),
                    }
                }
                Type::instance(template, args)
            }
            Type::Basic(_) | Type::Named(_) | Type::Placeholder(_) | Type::Error => self.clone(),
        }
    }
}

fn push_unique(out: &mut SmallVec<[ParamIdx; 4]>, idx: ParamIdx) {
    if !out.contains(&idx) {
        out.push(idx);
    }
}

impl From<BasicType> for Type {
    fn from(basic: BasicType) -> Self {
        Type::Basic(basic)
    }
}
