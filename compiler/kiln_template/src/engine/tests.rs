#![allow(
    clippy::unwrap_used,
    reason = "test code uses unwrap for concise assertions"
)]

use pretty_assertions::assert_eq;

use super::*;
use crate::argument::{TemplateArg, Value};
use crate::chain::Chain;
use crate::decl::{DeclFlags, ParamListError, Visibility};
use crate::ids::ScopeId;
use crate::param::TemplateParam;
use crate::test_support::{Expr, TestSema};

fn engine(sema: &TestSema) -> Engine {
    Engine::with_config(sema.interner.clone(), crate::config::EngineConfig::unlimited())
}

fn request(decl: DeclId, args: Vec<TemplateArg>) -> Request {
    Request::new(decl, args, ScopeId::new(0), ModuleId::new(0))
}

fn int() -> TemplateArg {
    TemplateArg::Type(Type::INT)
}

#[test]
fn declare_rejects_a_misplaced_sequence() {
    let sema = TestSema::new();
    let mut engine = engine(&sema);
    let decl = sema.decl(
        "Foo",
        vec![TemplateParam::tuple(sema.name("Rest")), TemplateParam::ty(sema.name("T"))],
    );
    let err = engine.declare(decl).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::InvalidParameterList {
            reason: ParamListError::TupleNotLast,
            ..
        }
    ));
    assert_eq!(engine.decl_count(), 0);
    assert_eq!(engine.diagnostics().error_count(), 1);
}

#[test]
fn overloads_chain_from_the_root() {
    let sema = TestSema::new();
    let mut engine = engine(&sema);
    let t = sema.name("T");
    let a = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(t)])).unwrap();
    let b = engine
        .overload_insert(a, sema.decl("Foo", vec![TemplateParam::value(t, Type::INT)]))
        .unwrap();
    // inserting through a non-root member still appends to the root's chain
    let c = engine
        .overload_insert(b, sema.decl("Foo", vec![TemplateParam::alias(t)]))
        .unwrap();
    assert_eq!(engine.overloads(c).collect::<Vec<_>>(), vec![a, b, c]);
    assert_eq!(engine.decl(c).root(), Some(a));
    assert_eq!(engine.decl(a).next(), Some(b));
}

#[test]
fn equal_requests_share_an_instance() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let foo = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])).unwrap();

    let first = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();
    let second = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();
    let other = engine
        .instantiate(&mut sema, &request(foo, vec![TemplateArg::Type(Type::BOOL)]), Chain::EMPTY)
        .unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(engine.stats().created, 2);
    assert_eq!(engine.stats().cache_hits, 1);
    assert_eq!(engine.instance(first).state(), InstanceState::Complete);
    assert_eq!(engine.display(&sema, first), "Foo!(int)");
}

#[test]
fn selection_prefers_the_specialized_overload() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let t = sema.name("T");
    let general = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(t)])).unwrap();
    let special = engine
        .overload_insert(
            general,
            sema.decl("Foo", vec![TemplateParam::ty(t).with_spec_type(Type::array(Type::param(0)))]),
        )
        .unwrap();

    let args = [Argument::Type(Type::array(Type::INT))];
    let (chosen, deduction) = engine
        .select(&mut sema, general, &args, None, ModuleId::new(0))
        .unwrap();
    assert_eq!(chosen, special);
    assert_eq!(deduction.args, vec![Argument::Type(Type::INT)]);

    let (chosen, _) = engine
        .select(&mut sema, general, &[Argument::Type(Type::INT)], None, ModuleId::new(0))
        .unwrap();
    assert_eq!(chosen, general);
    assert_eq!(engine.compare(&mut sema, special, general), Order::MoreSpecific);
}

#[test]
fn identical_overloads_are_ambiguous() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let first = sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))]);
    let a = engine.declare(first.at(kiln_ir::Span::new(0, 3))).unwrap();
    let second = sema.decl("Foo", vec![TemplateParam::ty(sema.name("U"))]);
    engine
        .overload_insert(a, second.at(kiln_ir::Span::new(10, 13)))
        .unwrap();

    let err = engine.instantiate(&mut sema, &request(a, vec![int()]), Chain::EMPTY).unwrap_err();
    assert!(matches!(err, TemplateError::AmbiguousOverload { .. }));
    assert_eq!(engine.instance_count(), 0);

    let diag = &engine.take_diagnostics()[0];
    let secondary: Vec<_> = diag
        .labels
        .iter()
        .filter(|label| !label.is_primary)
        .map(|label| label.span)
        .collect();
    assert_eq!(secondary, vec![kiln_ir::Span::new(0, 3), kiln_ir::Span::new(10, 13)]);
}

#[test]
fn single_candidate_mismatch_names_the_parameter() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let foo = engine
        .declare(sema.decl("Foo", vec![TemplateParam::value(sema.name("n"), Type::INT)]))
        .unwrap();
    let err = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap_err();
    let TemplateError::ArgumentMismatch { instance, .. } = &err else {
        panic!("expected a mismatch, got {err:?}");
    };
    assert_eq!(instance, "Foo!(int)");
}

#[test]
fn several_rejections_list_every_candidate() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let n = sema.name("n");
    let a = engine.declare(sema.decl("Foo", vec![TemplateParam::value(n, Type::INT)])).unwrap();
    engine
        .overload_insert(a, sema.decl("Foo", vec![TemplateParam::alias(n)]))
        .unwrap();
    let err = engine.instantiate(&mut sema, &request(a, vec![int()]), Chain::EMPTY).unwrap_err();
    let TemplateError::NoMatchingOverload { candidates, .. } = err else {
        panic!("expected no match");
    };
    assert_eq!(candidates.len(), 2);
}

#[test]
fn constraint_only_rejection_is_reported_as_such() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let never = sema.expr(Expr::Const(Value::bool(false)));
    let foo = engine
        .declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))]).with_constraint(never))
        .unwrap();
    let err = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap_err();
    assert!(matches!(err, TemplateError::ConstraintFailed { .. }), "{err:?}");
}

#[test]
fn private_declarations_are_invisible_elsewhere() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let foo = engine
        .declare(
            sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])
                .with_visibility(Visibility::Private),
        )
        .unwrap();
    let elsewhere = Request::new(foo, vec![int()], ScopeId::new(0), ModuleId::new(7));
    let err = engine.instantiate(&mut sema, &elsewhere, Chain::EMPTY).unwrap_err();
    assert!(matches!(
        &err,
        TemplateError::NoMatchingOverload { candidates, .. } if candidates.is_empty()
    ));
    assert!(engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).is_ok());
}

#[test]
fn mixin_only_templates_need_a_target() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let mix = engine
        .declare(
            sema.decl("Mix", vec![TemplateParam::ty(sema.name("T"))])
                .with_flags(DeclFlags::MIXIN_ONLY),
        )
        .unwrap();
    let err = engine.instantiate(&mut sema, &request(mix, vec![int()]), Chain::EMPTY).unwrap_err();
    assert!(matches!(err, TemplateError::MixinOnly { .. }));

    let target = MixinTarget {
        aggregate: SymbolId::new(40),
        scope: ScopeId::new(0),
    };
    let id = engine
        .instantiate_mixin(&mut sema, &request(mix, vec![int()]), target, Chain::EMPTY)
        .unwrap();
    assert!(engine.instance(id).flags().contains(InstanceFlags::MIXIN));
    assert_eq!(engine.instance(id).mixin_target(), Some(SymbolId::new(40)));
}

#[test]
fn failing_argument_is_a_semantic_error() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let foo = engine
        .declare(sema.decl("Foo", vec![TemplateParam::value(sema.name("n"), Type::INT)]))
        .unwrap();
    let bad = sema.expr(Expr::Fail("undefined identifier `x`"));
    let err = engine
        .instantiate(&mut sema, &request(foo, vec![TemplateArg::Expr(bad)]), Chain::EMPTY)
        .unwrap_err();
    assert_eq!(err.code(), kiln_diagnostic::ErrorCode::E4009);
    assert_eq!(engine.instance_count(), 0);
    assert!(engine.has_errors().is_some());
    engine.take_diagnostics();
    assert!(engine.has_errors().is_none());
}

#[test]
fn gagged_failures_stay_quiet() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let foo = engine
        .declare(sema.decl("Foo", vec![TemplateParam::value(sema.name("n"), Type::INT)]))
        .unwrap();
    let err = engine.instantiate(&mut sema, &request(foo, vec![int()]).gagged(), Chain::EMPTY);
    assert!(err.is_err());
    assert_eq!(engine.diagnostics().error_count(), 0);
    assert_eq!(engine.diagnostics().gagged_count(), 1);
    assert!(!engine.diagnostics().is_gagged());
    assert!(engine.has_errors().is_none());
}

#[test]
fn nesting_limit_is_enforced() {
    let mut sema = TestSema::new();
    let config = crate::config::EngineConfig::unlimited().with_recursion_limit(0);
    let mut engine = Engine::with_config(sema.interner.clone(), config);
    let foo = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])).unwrap();
    let err = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap_err();
    assert!(matches!(err, TemplateError::NestingDepthExceeded { limit: 0, .. }));
}

#[test]
fn codegen_is_claimed_once_by_the_root_module() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let root = ModuleId::new(0);
    engine.add_root_module(root);
    let foo = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])).unwrap();

    let imported = Request::new(foo, vec![TemplateArg::Type(Type::BOOL)], ScopeId::new(0), ModuleId::new(3));
    let from_import = engine.instantiate(&mut sema, &imported, Chain::EMPTY).unwrap();
    assert!(!engine.needs_codegen(from_import));

    let id = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();
    assert_eq!(engine.codegen_owner(id), Some(root));
    assert!(!engine.claim_codegen(id, ModuleId::new(3)));
    assert!(engine.claim_codegen(id, root));
    assert!(!engine.claim_codegen(id, root));
}

#[test]
fn speculative_first_use_gains_an_owner_later() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    engine.add_root_module(ModuleId::new(0));
    let foo = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])).unwrap();

    let id = engine
        .instantiate(&mut sema, &request(foo, vec![int()]).gagged(), Chain::EMPTY)
        .unwrap();
    assert!(engine.instance(id).is_gagged());
    assert_eq!(engine.codegen_owner(id), None);

    let again = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();
    assert_eq!(again, id);
    assert!(!engine.instance(id).is_gagged());
    assert_eq!(engine.codegen_owner(id), Some(ModuleId::new(0)));
}

#[test]
fn mangled_names_are_stable() {
    let mut sema = TestSema::new();
    let mut engine = engine(&sema);
    let foo = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])).unwrap();
    let id = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();
    assert_eq!(engine.mangle(&sema, id), engine.mangle(&sema, id));
    assert!(engine.mangle(&sema, id).starts_with("__T3Foo"));
}

#[test]
fn cache_hits_are_allowed_at_the_nesting_limit() {
    let mut sema = TestSema::new();
    let config = crate::config::EngineConfig::unlimited().with_recursion_limit(1);
    let mut engine = Engine::with_config(sema.interner.clone(), config);
    let foo = engine.declare(sema.decl("Foo", vec![TemplateParam::ty(sema.name("T"))])).unwrap();
    let id = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();

    let frame = crate::chain::Frame::new(Chain::EMPTY, foo, id, &[], None, kiln_ir::Span::DUMMY);
    let at_limit = Chain::from(&frame);
    assert_eq!(engine.instantiate(&mut sema, &request(foo, vec![int()]), at_limit), Ok(id));

    let fresh = request(foo, vec![TemplateArg::Type(Type::BOOL)]);
    let err = engine.instantiate(&mut sema, &fresh, at_limit).unwrap_err();
    assert!(matches!(err, TemplateError::NestingDepthExceeded { limit: 1, .. }));
    assert_eq!(engine.instance_count(), 1);
}

/// Re-requests the instance being elaborated without passing the chain on.
struct DropsChain {
    base: TestSema,
    need: Need,
    asked: bool,
    nested: Option<Result<InstanceId, TemplateError>>,
}

impl Semantic for DropsChain {
    fn evaluate(
        &mut self,
        expr: crate::ids::ExprId,
        scope: ScopeId,
    ) -> Result<Value, crate::semantic::SemanticFailure> {
        self.base.evaluate(expr, scope)
    }

    fn open_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.base.open_scope(parent)
    }

    fn declare_symbol(&mut self, scope: ScopeId, name: Name, value: &Argument) {
        self.base.declare_symbol(scope, name, value);
    }

    fn symbol_name(&self, symbol: SymbolId) -> Name {
        self.base.symbol_name(symbol)
    }

    fn elaborate_members(
        &mut self,
        engine: &mut Engine,
        _chain: Chain<'_>,
        instance: InstanceId,
    ) -> Result<crate::instance::MemberTable, crate::semantic::SemanticFailure> {
        if !self.asked {
            self.asked = true;
            let inst = engine.instance(instance);
            let mut again = request(inst.decl(), inst.supplied_args().to_vec());
            again.need = self.need;
            self.nested = Some(engine.instantiate(self, &again, Chain::EMPTY));
        }
        Ok(crate::instance::MemberTable::new())
    }
}

#[test]
fn in_progress_instance_off_the_chain_is_recursive() {
    let mut sema = DropsChain {
        base: TestSema::new(),
        need: Need::Members,
        asked: false,
        nested: None,
    };
    let mut engine = engine(&sema.base);
    let foo = engine
        .declare(sema.base.decl("Foo", vec![TemplateParam::ty(sema.base.name("T"))]))
        .unwrap();
    let id = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();

    assert!(matches!(sema.nested, Some(Err(TemplateError::RecursiveExpansion { .. }))));
    assert_eq!(engine.instance(id).state(), InstanceState::Complete);
    let codes: Vec<_> = engine.take_diagnostics().into_iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![kiln_diagnostic::ErrorCode::E4005]);
}

#[test]
fn in_progress_instance_off_the_chain_serves_a_reference() {
    let mut sema = DropsChain {
        base: TestSema::new(),
        need: Need::Reference,
        asked: false,
        nested: None,
    };
    let mut engine = engine(&sema.base);
    let foo = engine
        .declare(sema.base.decl("Foo", vec![TemplateParam::ty(sema.base.name("T"))]))
        .unwrap();
    let id = engine.instantiate(&mut sema, &request(foo, vec![int()]), Chain::EMPTY).unwrap();

    assert_eq!(sema.nested, Some(Ok(id)));
    assert_eq!(engine.diagnostics().error_count(), 0);
}
