//! A table-driven semantic service for unit tests.

#![allow(
    clippy::unwrap_used,
    reason = "test code uses unwrap for concise assertions"
)]

use std::sync::Arc;

use kiln_ir::{Name, SharedInterner, Span, StringInterner};
use rustc_hash::FxHashMap;

use crate::argument::{Argument, Value};
use crate::chain::Chain;
use crate::decl::TemplateDecl;
use crate::engine::Engine;
use crate::ids::{DeclId, ExprId, InstanceId, ModuleId, ScopeId, SymbolId};
use crate::instance::MemberTable;
use crate::matcher::MatchLevel;
use crate::param::TemplateParam;
use crate::semantic::{Semantic, SemanticFailure};
use crate::ty::{BasicType, Type};

/// What evaluating an expression yields.
pub enum Expr {
    Const(Value),
    /// Decide from the parameter bindings visible in the scope.
    Check(fn(&[(Name, Argument)]) -> bool),
    Fail(&'static str),
}

#[derive(Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    bindings: Vec<(Name, Argument)>,
}

pub struct TestSema {
    pub interner: SharedInterner,
    scopes: Vec<ScopeData>,
    exprs: Vec<Expr>,
    pub symbol_names: FxHashMap<SymbolId, Name>,
    pub symbol_types: FxHashMap<SymbolId, Type>,
    pub evaluations: usize,
}

impl TestSema {
    pub fn new() -> Self {
        TestSema {
            interner: Arc::new(StringInterner::new()),
            scopes: vec![ScopeData::default()],
            exprs: Vec::new(),
            symbol_names: FxHashMap::default(),
            symbol_types: FxHashMap::default(),
            evaluations: 0,
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        ExprId::new(u32::try_from(self.exprs.len() - 1).unwrap())
    }

    pub fn decl(&self, name: &str, params: Vec<TemplateParam>) -> TemplateDecl {
        TemplateDecl::new(self.name(name), SymbolId::new(0), ModuleId::new(0), ScopeId::new(0))
            .with_params(params)
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

fn is_integral(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Basic(
            BasicType::Byte
                | BasicType::Ubyte
                | BasicType::Short
                | BasicType::Ushort
                | BasicType::Int
                | BasicType::Uint
                | BasicType::Long
                | BasicType::Ulong
        )
    )
}

impl Semantic for TestSema {
    fn evaluate(&mut self, expr: ExprId, scope: ScopeId) -> Result<Value, SemanticFailure> {
        self.evaluations += 1;
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

    fn symbol_type(&self, symbol: SymbolId) -> Option<Type> {
        self.symbol_types.get(&symbol).cloned()
    }

    fn implicit_conversion(&self, from: &Type, to: &Type) -> MatchLevel {
        if from == to {
            MatchLevel::Exact
        } else if is_integral(from) && is_integral(to) {
            MatchLevel::Convert
        } else {
            MatchLevel::NoMatch
        }
    }

    fn symbol_name(&self, symbol: SymbolId) -> Name {
        self.symbol_names.get(&symbol).copied().unwrap_or(Name::EMPTY)
    }

    fn elaborate_members(
        &mut self,
        _engine: &mut Engine,
        _chain: Chain<'_>,
        _instance: InstanceId,
    ) -> Result<MemberTable, SemanticFailure> {
        Ok(MemberTable::new())
    }
}

/// Pair a declaration with an id for the free matcher/ranker functions.
pub fn with_id(decl: &TemplateDecl, raw: u32) -> (DeclId, &TemplateDecl) {
    (DeclId::new(raw), decl)
}
