//! The instantiation engine.
//!
//! [`Engine`] owns every declaration and instance of a compilation session
//! in two arenas, plus the diagnostic queue. The semantic service is passed
//! into each call rather than stored, so member elaboration can call back
//! into the engine.

mod instantiate;
mod request;

use kiln_diagnostic::{Diagnostic, DiagnosticQueue, ErrorGuaranteed};
use kiln_ir::{Name, SharedInterner};
use rustc_hash::FxHashSet;

use crate::argument::Argument;
use crate::config::EngineConfig;
use crate::decl::TemplateDecl;
use crate::display::Printer;
use crate::error::TemplateError;
use crate::ids::{DeclId, InstanceId, ModuleId, SymbolId};
use crate::instance::{Instance, InstanceFlags, InstanceState};
use crate::mangle::Mangler;
use crate::matcher::{match_declaration, Deduction, MatchMode, Rejection};
use crate::rank::{self, Candidate, Order, Selection};
use crate::semantic::Semantic;
use crate::trace::{format_trace, TraceEntry};
use crate::ty::Type;

pub use request::{MixinTarget, Need, Request};

#[cfg(test)]
mod tests;

/// Counters for observing engine behavior.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EngineStats {
    pub requests: usize,
    pub cache_hits: usize,
    /// Cache lookups that found an equal hash with unequal arguments.
    pub collisions: usize,
    pub created: usize,
    /// Failed speculative instances dropped from their cache.
    pub evicted: usize,
}

pub struct Engine {
    interner: SharedInterner,
    config: EngineConfig,
    decls: Vec<TemplateDecl>,
    instances: Vec<Instance>,
    root_modules: FxHashSet<ModuleId>,
    diagnostics: DiagnosticQueue,
    stats: EngineStats,
}

impl Engine {
    pub fn new(interner: SharedInterner) -> Self {
        Self::with_config(interner, EngineConfig::default())
    }

    pub fn with_config(interner: SharedInterner, config: EngineConfig) -> Self {
        Engine {
            interner,
            diagnostics: DiagnosticQueue::with_config(config.diagnostics.clone()),
            config,
            decls: Vec::new(),
            instances: Vec::new(),
            root_modules: FxHashSet::default(),
            stats: EngineStats::default(),
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticQueue {
        &mut self.diagnostics
    }

    /// Proof that an error has surfaced since the last drain. Gagged
    /// failures do not count.
    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        self.diagnostics.has_errors()
    }

    /// Drain every reported diagnostic.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.flush()
    }

    // Declarations

    /// Register a declaration as the root of a new overload set.
    pub fn declare(&mut self, mut decl: TemplateDecl) -> Result<DeclId, TemplateError> {
        if let Err(reason) = decl.finalize() {
            let err = TemplateError::InvalidParameterList {
                template: self.interner.lookup(decl.name).to_string(),
                reason,
                span: decl.span,
            };
            self.diagnostics.add(err.to_diagnostic(&[]));
            return Err(err);
        }
        let id = DeclId::new(arena_index(self.decls.len()));
        tracing::debug!(decl = id.raw(), name = self.interner.lookup(decl.name), "declared template");
        self.decls.push(decl);
        Ok(id)
    }

    /// Register `decl` and append it to the overload set of `existing`.
    pub fn overload_insert(
        &mut self,
        existing: DeclId,
        decl: TemplateDecl,
    ) -> Result<DeclId, TemplateError> {
        let root = self.decls[existing.index()].root.unwrap_or(existing);
        let last = self.overloads(root).last().unwrap_or(root);
        let id = self.declare(decl)?;
        self.decls[id.index()].root = Some(root);
        self.decls[last.index()].next = Some(id);
        Ok(id)
    }

    pub fn decl(&self, id: DeclId) -> &TemplateDecl {
        &self.decls[id.index()]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Every declaration in the overload set of `id`, root first.
    pub fn overloads(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        let root = self.decls[id.index()].root.unwrap_or(id);
        std::iter::successors(Some(root), |cur| self.decls[cur.index()].next)
    }

    // Instances

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Cached instances of `decl`.
    pub fn instances_of(&self, decl: DeclId) -> impl Iterator<Item = InstanceId> + '_ {
        self.decls[decl.index()].cache.iter()
    }

    /// The eponymous member of an instance, if it has one.
    pub fn to_alias(&self, id: InstanceId) -> Option<SymbolId> {
        self.instances[id.index()].to_alias()
    }

    // Selection

    /// Compare two declarations by specialization.
    pub fn compare<S: Semantic + ?Sized>(&self, sema: &mut S, a: DeclId, b: DeclId) -> Order {
        rank::compare(
            sema,
            (a, &self.decls[a.index()]),
            (b, &self.decls[b.index()]),
        )
    }

    /// Choose the declaration of the overload set of `decl` that best fits
    /// resolved `args`.
    #[tracing::instrument(level = "debug", skip_all, fields(decl = decl.raw(), args = args.len()))]
    pub fn select<S: Semantic + ?Sized>(
        &self,
        sema: &mut S,
        decl: DeclId,
        args: &[Argument],
        receiver: Option<&Type>,
        from: ModuleId,
    ) -> Result<(DeclId, Deduction), SelectError> {
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        let mut deduced: Vec<Vec<Argument>> = Vec::new();
        let mut rejected: Vec<(DeclId, Rejection)> = Vec::new();
        for id in self.overloads(decl) {
            let candidate = &self.decls[id.index()];
            if !candidate.is_visible_from(from) {
                continue;
            }
            match match_declaration(sema, candidate, id, args, receiver, MatchMode::Instantiate) {
                Ok(Deduction { level, args }) => {
                    candidates.push(Candidate {
                        id,
                        decl: candidate,
                        level,
                    });
                    deduced.push(args);
                }
                Err(why) => rejected.push((id, why)),
            }
        }

        match rank::select_best(sema, &candidates) {
            Selection::Unique(i) => {
                let winner = &candidates[i];
                tracing::debug!(decl = winner.id.raw(), level = ?winner.level, "selected");
                Ok((
                    winner.id,
                    Deduction {
                        level: winner.level,
                        args: deduced.swap_remove(i),
                    },
                ))
            }
            Selection::Ambiguous(a, b) => {
                Err(SelectError::Ambiguous(candidates[a].id, candidates[b].id))
            }
            Selection::Empty => Err(SelectError::NoMatch(rejected)),
        }
    }

    // Printing

    /// `Foo!(int, 3)` form of an instance.
    pub fn display<S: Semantic + ?Sized>(&self, sema: &S, id: InstanceId) -> String {
        let inst = &self.instances[id.index()];
        let names = |sym: SymbolId| sema.symbol_name(sym);
        Printer::new(&self.interner, &names).instance(inst.name, &inst.resolved)
    }

    /// Deterministic mangled identifier of an instance.
    pub fn mangle<S: Semantic + ?Sized>(&self, sema: &S, id: InstanceId) -> String {
        let inst = &self.instances[id.index()];
        let names = |sym: SymbolId| sema.symbol_name(sym);
        Mangler::new(&self.interner, &names).instance(inst.name, &inst.deduced)
    }

    /// "instantiated from here" lines for the instances enclosing `id`,
    /// innermost first.
    pub fn instantiation_trace<S: Semantic + ?Sized>(&self, sema: &S, id: InstanceId) -> Vec<String> {
        let names = |sym: SymbolId| sema.symbol_name(sym);
        let printer = Printer::new(&self.interner, &names);
        let entries: Vec<TraceEntry> =
            std::iter::successors(Some(id), |cur| self.instances[cur.index()].enclosing_instance)
                .map(|cur| {
                    let inst = &self.instances[cur.index()];
                    TraceEntry {
                        decl: inst.decl,
                        name: printer.instance(inst.name, &inst.resolved),
                        span: inst.span,
                    }
                })
                .collect();
        format_trace(&entries, self.config.trace_max_shown)
    }

    pub(crate) fn printer<'a>(&'a self, names: &'a dyn Fn(SymbolId) -> Name) -> Printer<'a> {
        Printer::new(&self.interner, names)
    }

    // Codegen ownership

    /// Mark `module` as being compiled in this session.
    pub fn add_root_module(&mut self, module: ModuleId) {
        self.root_modules.insert(module);
    }

    pub fn is_root_module(&self, module: ModuleId) -> bool {
        self.root_modules.contains(&module)
    }

    /// The module that must emit code for `id`, if any.
    ///
    /// An instance first reached speculatively inherits the owner of the
    /// instance that reached it.
    pub fn codegen_owner(&self, id: InstanceId) -> Option<ModuleId> {
        std::iter::successors(Some(id), |cur| self.instances[cur.index()].enclosing_instance)
            .find_map(|cur| self.instances[cur.index()].first_module)
    }

    pub fn needs_codegen(&self, id: InstanceId) -> bool {
        self.instances[id.index()].state == InstanceState::Complete
            && self.codegen_owner(id).is_some()
    }

    /// Claim code emission for `id` on behalf of `module`. True exactly
    /// once, and only for the owner.
    pub fn claim_codegen(&mut self, id: InstanceId, module: ModuleId) -> bool {
        if !self.needs_codegen(id) || self.codegen_owner(id) != Some(module) {
            return false;
        }
        let inst = &mut self.instances[id.index()];
        if inst.flags.contains(InstanceFlags::CODEGEN_CLAIMED) {
            return false;
        }
        inst.flags.insert(InstanceFlags::CODEGEN_CLAIMED);
        tracing::debug!(instance = id.raw(), module = module.raw(), "codegen claimed");
        true
    }
}

/// Why [`Engine::select`] found no single winner.
#[derive(Clone, Debug)]
pub enum SelectError {
    NoMatch(Vec<(DeclId, Rejection)>),
    Ambiguous(DeclId, DeclId),
}

pub(crate) fn arena_index(len: usize) -> u32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "arenas never approach u32::MAX entries"
    )]
    let raw = len as u32;
    raw
}
