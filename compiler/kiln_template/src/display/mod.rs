//! Source-like rendering of types, arguments and instances.

use std::fmt::Write;

use kiln_ir::{Name, StringInterner};

use crate::argument::{Argument, Constant, TemplateArg, Value};
use crate::decl::TemplateDecl;
use crate::ids::SymbolId;
use crate::param::{ParamKind, TemplateParam};
use crate::ty::{Dim, InstanceType, TemplateRef, Type};

#[cfg(test)]
mod tests;

/// Nesting beyond this prints as `...`.
const MAX_NESTING: u32 = 16;

pub struct Printer<'a> {
    interner: &'a StringInterner,
    names: &'a dyn Fn(SymbolId) -> Name,
    params: &'a [TemplateParam],
}

impl<'a> Printer<'a> {
    pub fn new(interner: &'a StringInterner, names: &'a dyn Fn(SymbolId) -> Name) -> Self {
        Printer {
            interner,
            names,
            params: &[],
        }
    }

    /// Print parameter references with these names.
    #[must_use]
    pub fn with_params(mut self, params: &'a [TemplateParam]) -> Self {
        self.params = params;
        self
    }

    fn name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    fn symbol(&self, symbol: SymbolId) -> &'static str {
        if symbol.is_placeholder() {
            "?"
        } else {
            self.name((self.names)(symbol))
        }
    }

    /// `Foo!(int, 3)`
    pub fn instance(&self, name: Name, args: &[Argument]) -> String {
        let mut out = String::new();
        out.push_str(self.name(name));
        out.push_str("!(");
        self.write_args(&mut out, args, 0);
        out.push(')');
        out
    }

    /// Like [`Printer::instance`], for arguments not yet resolved.
    pub fn request(&self, name: Name, args: &[TemplateArg]) -> String {
        let mut out = String::new();
        out.push_str(self.name(name));
        out.push_str("!(");
        self.write_template_args(&mut out, args);
        out.push(')');
        out
    }

    /// `Foo(T : T[], int n = ...)`
    pub fn signature(&self, decl: &TemplateDecl) -> String {
        let printer = Printer {
            params: &decl.params,
            ..*self
        };
        let mut out = String::new();
        out.push_str(self.name(decl.name));
        out.push('(');
        for (i, param) in decl.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            printer.write_param(&mut out, param);
        }
        out.push(')');
        if decl.constraint.is_some() {
            out.push_str(" if (...)");
        }
        out
    }

    pub fn param(&self, param: &TemplateParam) -> String {
        let mut out = String::new();
        self.write_param(&mut out, param);
        out
    }

    pub fn ty(&self, ty: &Type) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty, 0);
        out
    }

    pub fn arg(&self, arg: &Argument) -> String {
        let mut out = String::new();
        self.write_arg(&mut out, arg, 0);
        out
    }

    fn write_param(&self, out: &mut String, param: &TemplateParam) {
        let name = self.name(param.name);
        match &param.kind {
            ParamKind::Type(p) | ParamKind::This(p) => {
                if param.is_this() {
                    out.push_str("this ");
                }
                out.push_str(name);
                if let Some(spec) = &p.spec {
                    out.push_str(" : ");
                    self.write_type(out, spec, 0);
                }
                if let Some(default) = &p.default {
                    out.push_str(" = ");
                    self.write_type(out, default, 0);
                }
            }
            ParamKind::Value(p) => {
                self.write_type(out, &p.ty, 0);
                let _ = write!(out, " {name}");
                if p.spec.is_some() {
                    out.push_str(" : ...");
                }
                if p.default.is_some() {
                    out.push_str(" = ...");
                }
            }
            ParamKind::Alias(p) => {
                out.push_str("alias ");
                out.push_str(name);
                if let Some(sym) = p.spec_alias {
                    let _ = write!(out, " : {}", self.symbol(sym));
                } else if let Some(spec) = &p.spec_type {
                    out.push_str(" : ");
                    self.write_type(out, spec, 0);
                }
                if let Some(sym) = p.default {
                    let _ = write!(out, " = {}", self.symbol(sym));
                }
            }
            ParamKind::Tuple => {
                let _ = write!(out, "{name}...");
            }
        }
    }

    fn write_args(&self, out: &mut String, args: &[Argument], depth: u32) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_arg(out, arg, depth);
        }
    }

    fn write_arg(&self, out: &mut String, arg: &Argument, depth: u32) {
        match arg {
            Argument::Type(ty) => self.write_type(out, ty, depth),
            Argument::Value(value) => self.write_value(out, value),
            Argument::Alias(sym) => out.push_str(self.symbol(*sym)),
            Argument::Tuple(tuple) => {
                out.push('(');
                self.write_args(out, tuple.as_slice(), depth);
                out.push(')');
            }
        }
    }

    fn write_template_args(&self, out: &mut String, args: &[TemplateArg]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match arg {
                TemplateArg::Type(ty) => self.write_type(out, ty, 0),
                TemplateArg::Value(value) => self.write_value(out, value),
                TemplateArg::Expr(expr) => {
                    let _ = write!(out, "expr#{}", expr.raw());
                }
                TemplateArg::Symbol(sym) => out.push_str(self.symbol(*sym)),
                TemplateArg::Tuple(items) => self.write_template_args(out, items),
            }
        }
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        let _ = match &value.constant {
            Constant::Int(n) => write!(out, "{n}"),
            Constant::Bool(b) => write!(out, "{b}"),
            Constant::Char(c) => write!(out, "'{}'", c.escape_default()),
            Constant::Str(s) => write!(out, "\"{}\"", self.name(*s).escape_default()),
            Constant::Null => write!(out, "null"),
            Constant::Opaque(_) => write!(out, "?"),
        };
    }

    fn write_type(&self, out: &mut String, ty: &Type, depth: u32) {
        if depth > MAX_NESTING {
            out.push_str("...");
            return;
        }
        match ty {
            Type::Basic(b) => out.push_str(b.name()),
            Type::Named(sym) => out.push_str(self.symbol(*sym)),
            Type::Const(inner) => {
                out.push_str("const(");
                self.write_type(out, inner, depth + 1);
                out.push(')');
            }
            Type::Pointer(inner) => {
                self.write_type(out, inner, depth + 1);
                out.push('*');
            }
            Type::Array(inner) => {
                self.write_type(out, inner, depth + 1);
                out.push_str("[]");
            }
            Type::StaticArray(inner, dim) => {
                self.write_type(out, inner, depth + 1);
                let _ = match dim {
                    Dim::Known(n) => write!(out, "[{n}]"),
                    Dim::Param(idx) => write!(out, "[{}]", self.param_name(idx.raw())),
                    Dim::Opaque(_) => write!(out, "[?]"),
                };
            }
            Type::Instance(inst) => self.write_instance_type(out, inst, depth),
            Type::Param(idx) => out.push_str(self.param_name(idx.raw())),
            Type::Placeholder(_) => out.push('?'),
            Type::Error => out.push_str("__error"),
        }
    }

    fn write_instance_type(&self, out: &mut String, inst: &InstanceType, depth: u32) {
        match inst.template {
            TemplateRef::Symbol(sym) => out.push_str(self.symbol(sym)),
            TemplateRef::Param(idx) => out.push_str(self.param_name(idx.raw())),
        }
        out.push_str("!(");
        self.write_args(out, &inst.args, depth + 1);
        out.push(')');
    }

    fn param_name(&self, raw: u32) -> &'static str {
        usize::try_from(raw)
            .ok()
            .and_then(|i| self.params.get(i))
            .map_or("?", |p| self.name(p.name))
    }
}
