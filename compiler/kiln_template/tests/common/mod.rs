//! A scriptable semantic service for the integration tests.
//!
//! Each declaration gets a body: a list of steps run when one of its
//! instances is elaborated. Steps declare members, fail, or request other
//! instances with arguments computed from the instance's own.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use kiln_ir::{Name, SharedInterner, Span, StringInterner};
use kiln_template::{
    Argument, Chain, Constant, DeclId, Engine, EngineConfig, ExprId, FieldLayout, InstanceId,
    Member, MemberTable, ModuleId, Need, Request, ScopeId, Semantic, SemanticFailure, SymbolId,
    TemplateArg, TemplateDecl, TemplateParam, Type, Value,
};
use rustc_hash::FxHashMap;

pub const MAIN: ModuleId = ModuleId::new(0);
pub const GLOBAL: ScopeId = ScopeId::new(0);

/// Computes the arguments of a nested request from the requesting
/// instance's deduced arguments. `None` skips the request.
pub type ArgsFn = fn(&[Argument]) -> Option<Vec<TemplateArg>>;

#[derive(Clone)]
pub enum Step {
    /// A member, with a field type when it occupies storage.
    Member(&'static str, Option<Type>),
    Fail(&'static str),
    Request {
        decl: DeclId,
        args: ArgsFn,
        need: Need,
        /// Speculative: the outcome is ignored.
        gagged: bool,
    },
}

pub enum Expr {
    Const(Value),
    /// Decide from the bindings visible in the evaluation scope.
    Check(fn(&[(Name, Argument)]) -> bool),
    Fail(&'static str),
}

#[derive(Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    bindings: Vec<(Name, Argument)>,
}

pub struct MockSema {
    pub interner: SharedInterner,
    scopes: Vec<ScopeData>,
    exprs: Vec<Expr>,
    bodies: FxHashMap<DeclId, Vec<Step>>,
    symbols: Vec<Name>,
    pub aliases: FxHashMap<SymbolId, SymbolId>,
    pub locals: FxHashMap<SymbolId, ScopeId>,
    pub elaborations: FxHashMap<DeclId, usize>,
    pub resumed: Vec<InstanceId>,
    pub injected: Vec<(SymbolId, Name)>,
}

impl MockSema {
    pub fn new() -> Self {
        let interner: SharedInterner = Arc::new(StringInterner::new());
        MockSema {
            interner,
            scopes: vec![ScopeData::default()],
            exprs: Vec::new(),
            bodies: FxHashMap::default(),
            symbols: Vec::new(),
            aliases: FxHashMap::default(),
            locals: FxHashMap::default(),
            elaborations: FxHashMap::default(),
            resumed: Vec::new(),
            injected: Vec::new(),
        }
    }

    pub fn engine(&self) -> Engine {
        Engine::with_config(self.interner.clone(), EngineConfig::unlimited())
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn decl(&self, name: &str, params: Vec<TemplateParam>) -> TemplateDecl {
        TemplateDecl::new(self.name(name), SymbolId::new(0), MAIN, GLOBAL).with_params(params)
    }

    pub fn body(&mut self, decl: DeclId, steps: Vec<Step>) {
        self.bodies.insert(decl, steps);
    }

    pub fn expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        ExprId::new(u32::try_from(self.exprs.len() - 1).unwrap())
    }

    pub fn symbol(&mut self, name: &str) -> SymbolId {
        self.symbols.push(self.interner.intern(name));
        SymbolId::new(u32::try_from(self.symbols.len() - 1).unwrap())
    }

    /// A symbol local to the function whose scope is `context`.
    pub fn local(&mut self, name: &str, context: ScopeId) -> SymbolId {
        let sym = self.symbol(name);
        self.locals.insert(sym, context);
        sym
    }

    pub fn elaborations(&self, decl: DeclId) -> usize {
        self.elaborations.get(&decl).copied().unwrap_or(0)
    }

    fn visible(&self, scope: ScopeId) -> Vec<(Name, Argument)> {
        let mut out = Vec::new();
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let Some(data) = self.scopes.get(s.raw() as usize) else {
                break;
            };
            out.extend(data.bindings.iter().cloned());
            cur = data.parent;
        }
        out
    }
}

impl Semantic for MockSema {
    fn evaluate(&mut self, expr: ExprId, scope: ScopeId) -> Result<Value, SemanticFailure> {
        match self.exprs.get(expr.raw() as usize) {
            Some(Expr::Const(value)) => Ok(value.clone()),
            Some(Expr::Check(check)) => Ok(Value::bool(check(&self.visible(scope)))),
            Some(Expr::Fail(message)) => Err(SemanticFailure::new(*message, Span::DUMMY)),
            None => Err(SemanticFailure::new("unknown expression", Span::DUMMY)),
        }
    }

    fn open_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(ScopeData {
            parent: Some(parent),
            bindings: Vec::new(),
        });
        ScopeId::new(u32::try_from(self.scopes.len() - 1).unwrap())
    }

    fn declare_symbol(&mut self, scope: ScopeId, name: Name, value: &Argument) {
        if let Some(data) = self.scopes.get_mut(scope.raw() as usize) {
            data.bindings.push((name, value.clone()));
        }
    }

    fn canonical_symbol(&self, symbol: SymbolId) -> SymbolId {
        let mut cur = symbol;
        while let Some(&next) = self.aliases.get(&cur) {
            cur = next;
        }
        cur
    }

    fn local_context(&self, symbol: SymbolId) -> Option<ScopeId> {
        self.locals.get(&symbol).copied()
    }

    fn symbol_name(&self, symbol: SymbolId) -> Name {
        self.symbols
            .get(symbol.raw() as usize)
            .copied()
            .unwrap_or(Name::EMPTY)
    }

    fn elaborate_members(
        &mut self,
        engine: &mut Engine,
        chain: Chain<'_>,
        instance: InstanceId,
    ) -> Result<MemberTable, SemanticFailure> {
        let inst = engine.instance(instance);
        let decl = inst.decl();
        let deduced = inst.deduced_args().to_vec();
        let scope = inst.param_scope().unwrap_or(GLOBAL);
        let module = inst.module_of();
        *self.elaborations.entry(decl).or_default() += 1;

        let mut members = MemberTable::new();
        let steps = self.bodies.get(&decl).cloned().unwrap_or_default();
        for step in steps {
            match step {
                Step::Member(name, field) => {
                    let symbol = self.symbol(name);
                    let name = self.name(name);
                    members.push(match field.as_ref().and_then(FieldLayout::of_type) {
                        Some(layout) => Member::field(name, symbol, layout),
                        None => Member::new(name, symbol),
                    });
                }
                Step::Fail(message) => return Err(SemanticFailure::new(message, Span::DUMMY)),
                Step::Request {
                    decl,
                    args,
                    need,
                    gagged,
                } => {
                    let Some(args) = args(&deduced) else {
                        continue;
                    };
                    let mut request = Request::new(decl, args, scope, module);
                    if need == Need::Reference {
                        request = request.reference_only();
                    }
                    if gagged {
                        let _ = engine.instantiate(self, &request.gagged(), chain);
                    } else {
                        engine.instantiate(self, &request, chain)?;
                    }
                }
            }
        }
        Ok(members)
    }

    fn resume(&mut self, _engine: &mut Engine, instance: InstanceId) -> Result<(), SemanticFailure> {
        self.resumed.push(instance);
        Ok(())
    }

    fn inject_member(&mut self, target: SymbolId, member: &Member) {
        self.injected.push((target, member.name));
    }
}

pub fn ty(t: Type) -> TemplateArg {
    TemplateArg::Type(t)
}

pub fn int(n: i128) -> TemplateArg {
    TemplateArg::Value(Value::int(n))
}

/// The integer value of a deduced argument.
pub fn int_of(arg: &Argument) -> Option<i128> {
    match arg {
        Argument::Value(Value {
            constant: Constant::Int(n),
            ..
        }) => Some(*n),
        _ => None,
    }
}

pub fn request(decl: DeclId, args: Vec<TemplateArg>) -> Request {
    Request::new(decl, args, GLOBAL, MAIN)
}
