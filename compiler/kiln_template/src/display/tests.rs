use kiln_ir::StringInterner;
use pretty_assertions::assert_eq;

use super::*;
use crate::ids::{ExprId, ModuleId, ParamIdx, ScopeId};

fn no_symbols(_: SymbolId) -> Name {
    Name::EMPTY
}

#[test]
fn instances_print_like_source() {
    let interner = StringInterner::new();
    let printer = Printer::new(&interner, &no_symbols);
    let foo = interner.intern("Foo");
    let args = vec![
        Argument::Type(Type::array(Type::constant(Type::INT))),
        Argument::Value(Value::int(3)),
        Argument::Value(Value::new(Type::CHAR, Constant::Char('x'))),
    ];
    assert_eq!(printer.instance(foo, &args), "Foo!(const(int)[], 3, 'x')");
}

#[test]
fn symbols_come_from_the_name_callback() {
    let interner = StringInterner::new();
    let list = interner.intern("List");
    let names = move |sym: SymbolId| if sym == SymbolId::new(7) { list } else { Name::EMPTY };
    let printer = Printer::new(&interner, &names);
    let ty = Type::pointer(Type::instance(
        TemplateRef::Symbol(SymbolId::new(7)),
        vec![Argument::Type(Type::INT)],
    ));
    assert_eq!(printer.ty(&ty), "List!(int)*");
}

#[test]
fn signatures_name_their_parameters() {
    let interner = StringInterner::new();
    let printer = Printer::new(&interner, &no_symbols);
    let t = interner.intern("T");
    let n = interner.intern("n");
    let rest = interner.intern("Rest");
    let decl = TemplateDecl::new(
        interner.intern("Foo"),
        SymbolId::new(0),
        ModuleId::new(0),
        ScopeId::new(0),
    )
    .with_params(vec![
        TemplateParam::ty(t).with_spec_type(Type::array(Type::param(0))),
        TemplateParam::value(n, Type::INT).with_default_value(ExprId::new(0)),
        TemplateParam::tuple(rest),
    ]);
    assert_eq!(printer.signature(&decl), "Foo(T : T[], int n = ..., Rest...)");
}

#[test]
fn static_array_dims_print_by_kind() {
    let interner = StringInterner::new();
    let printer = Printer::new(&interner, &no_symbols);
    assert_eq!(printer.ty(&Type::static_array(Type::INT, Dim::Known(4))), "int[4]");
    assert_eq!(
        printer.ty(&Type::static_array(Type::INT, Dim::Param(ParamIdx::new(9)))),
        "int[?]"
    );
}

#[test]
fn deep_nesting_is_cut_off() {
    let interner = StringInterner::new();
    let printer = Printer::new(&interner, &no_symbols);
    let mut ty = Type::INT;
    for _ in 0..40 {
        ty = Type::pointer(ty);
    }
    assert!(printer.ty(&ty).starts_with("...*"));
}

#[test]
fn unresolved_requests_show_expressions() {
    let interner = StringInterner::new();
    let printer = Printer::new(&interner, &no_symbols);
    let out = printer.request(
        interner.intern("A"),
        &[TemplateArg::Expr(ExprId::new(2)), TemplateArg::Type(Type::BOOL)],
    );
    assert_eq!(out, "A!(expr#2, bool)");
}
