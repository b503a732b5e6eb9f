//! Mangled identifiers for instances.
//!
//! `__T` + length-prefixed template name + one entry per deduced argument
//! + `Z`. Arguments are tagged `T` (type), `V` (value) or `S` (symbol);
//! sequences contribute their elements in place.

use std::fmt::Write;

use kiln_ir::{Name, StringInterner};

use crate::argument::{Argument, Constant, Value};
use crate::ids::SymbolId;
use crate::ty::{Dim, TemplateRef, Type};


pub struct Mangler<'a> {
    interner: &'a StringInterner,
    names: &'a dyn Fn(SymbolId) -> Name,
}

impl<'a> Mangler<'a> {
    pub fn new(interner: &'a StringInterner, names: &'a dyn Fn(SymbolId) -> Name) -> Self {
        Mangler { interner, names }
    }

    pub fn instance(&self, name: Name, args: &[Argument]) -> String {
        let mut out = String::from("__T");
        self.ident(&mut out, self.interner.lookup(name));
        for arg in args {
            self.arg(&mut out, arg);
        }
        out.push('Z');
        out
    }

    fn ident(&self, out: &mut String, ident: &str) {
        let _ = write!(out, "{}{ident}", ident.len());
    }

    fn symbol(&self, out: &mut String, symbol: SymbolId) {
        let name = self.interner.lookup((self.names)(symbol));
        self.ident(out, name);
    }

    fn arg(&self, out: &mut String, arg: &Argument) {
        match arg {
            Argument::Type(ty) => {
                out.push('T');
                self.ty(out, ty);
            }
            Argument::Value(value) => {
                out.push('V');
                self.value(out, value);
            }
            Argument::Alias(sym) => {
                out.push('S');
                self.symbol(out, *sym);
            }
            Argument::Tuple(tuple) => {
                for item in tuple.iter() {
                    self.arg(out, item);
                }
            }
        }
    }

    fn value(&self, out: &mut String, value: &Value) {
        self.ty(out, &value.ty);
        let _ = match &value.constant {
            Constant::Int(n) if *n < 0 => write!(out, "N{}", n.unsigned_abs()),
            Constant::Int(n) => write!(out, "i{n}"),
            Constant::Bool(b) => write!(out, "i{}", u8::from(*b)),
            Constant::Char(c) => write!(out, "i{}", u32::from(*c)),
            Constant::Str(s) => {
                let text = self.interner.lookup(*s);
                let _ = write!(out, "a{}_", text.len());
                text.bytes().try_for_each(|b| write!(out, "{b:02x}"))
            }
            Constant::Null => write!(out, "n"),
            Constant::Opaque(_) => write!(out, "?"),
        };
    }

    fn ty(&self, out: &mut String, ty: &Type) {
        match ty {
            Type::Basic(b) => out.push(b.mangle_code()),
            Type::Named(sym) => {
                out.push('S');
                self.symbol(out, *sym);
            }
            Type::Const(inner) => {
                out.push('x');
                self.ty(out, inner);
            }
            Type::Pointer(inner) => {
                out.push('P');
                self.ty(out, inner);
            }
            Type::Array(inner) => {
                out.push('A');
                self.ty(out, inner);
            }
            Type::StaticArray(inner, dim) => {
                out.push('G');
                if let Dim::Known(n) = dim {
                    let _ = write!(out, "{n}");
                } else {
                    out.push('?');
                }
                self.ty(out, inner);
            }
            Type::Instance(inst) => {
                let name = match inst.template {
                    TemplateRef::Symbol(sym) => (self.names)(sym),
                    TemplateRef::Param(_) => Name::EMPTY,
                };
                let nested = self.instance(name, &inst.args);
                out.push('S');
                self.ident(out, &nested);
            }
            Type::Param(_) | Type::Placeholder(_) | Type::Error => out.push('?'),
        }
    }
}
