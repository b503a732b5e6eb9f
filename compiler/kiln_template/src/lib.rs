//! Template instantiation for the Kiln compiler.
//!
//! A template declaration is a parameterized body. Instantiating it with
//! arguments selects the most specialized overload that matches, deduces
//! every parameter, and produces an [`Instance`] whose members the semantic
//! service elaborates. Equal requests share one instance.
//!
//! # Pipeline
//!
//! 1. Raw [`TemplateArg`]s are resolved into [`Argument`]s.
//! 2. Every visible overload is matched ([`match_declaration`]) and the
//!    survivors ranked ([`rank::select_best`]).
//! 3. The per-declaration [`InstanceCache`] is searched with the deduced
//!    arguments and enclosing scope.
//! 4. On a miss the instance is created and [`Semantic::elaborate_members`]
//!    runs with the instantiation [`Chain`], which guards against infinite
//!    expansion.
//!
//! Errors become [`TemplateError`]s and, through the engine's
//! [`DiagnosticQueue`](kiln_diagnostic::DiagnosticQueue), diagnostics with an
//! "instantiated from here" trace. Speculative requests gag them.

mod argument;
mod cache;
mod chain;
mod config;
mod decl;
mod display;
mod engine;
mod error;
mod ids;
mod instance;
mod mangle;
mod matcher;
mod mixin;
mod param;
pub mod rank;
mod semantic;
mod stack;
mod trace;
mod ty;

#[cfg(test)]
mod test_support;

use std::sync::Once;

pub use argument::{flatten, ArgKind, Argument, Constant, TemplateArg, Tuple, Value};
pub use cache::{content_hash, InstanceCache};
pub use chain::{Chain, ChainIter, Frame};
pub use config::{EngineConfig, DEFAULT_RECURSION_LIMIT, DEFAULT_TRACE_MAX_SHOWN};
pub use decl::{DeclFlags, ParamListError, TemplateDecl, Visibility};
pub use display::Printer;
pub use engine::{Engine, EngineStats, MixinTarget, Need, Request, SelectError};
pub use error::TemplateError;
pub use ids::{DeclId, ExprId, InstanceId, ModuleId, ParamIdx, Placeholder, ScopeId, SymbolId};
pub use instance::{FieldLayout, Instance, InstanceFlags, InstanceState, Member, MemberTable};
pub use mangle::Mangler;
pub use matcher::{match_declaration, Deduction, MatchLevel, MatchMode, Rejection};
pub use mixin::{AggregateLayout, LayoutError, PlacedField};
pub use param::{
    AliasParam, ParamKind, Specialization, TemplateParam, TypeParam, ValueParam,
};
pub use rank::Order;
pub use semantic::{Semantic, SemanticFailure};
pub use stack::ensure_sufficient_stack;
pub use trace::{format_trace, TraceEntry};
pub use ty::{BasicType, Dim, InstanceType, TemplateRef, Type};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset or on every call after the first.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
