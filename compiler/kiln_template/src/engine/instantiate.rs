//! Instantiation: resolve, select, look up the cache, elaborate.

use kiln_ir::Span;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::argument::{Argument, TemplateArg};
use crate::cache::content_hash;
use crate::chain::{Chain, Frame};
use crate::error::TemplateError;
use crate::ids::{DeclId, InstanceId, ModuleId, ScopeId, SymbolId};
use crate::instance::{Instance, InstanceFlags, InstanceState, MemberTable};
use crate::matcher::{Deduction, Rejection};
use crate::semantic::{Semantic, SemanticFailure};
use crate::stack::ensure_sufficient_stack;
use crate::trace::{format_trace, TraceEntry};

use super::{arena_index, Engine, MixinTarget, Need, Request, SelectError};

/// Cache identity of an instance.
#[derive(Copy, Clone)]
struct Key {
    hash: u64,
    enclosing: Option<ScopeId>,
}

impl Engine {
    /// Instantiate the overload set named by `request`.
    ///
    /// Returns the cached instance when one with equal deduced arguments and
    /// enclosing context exists; otherwise creates one and has `sema`
    /// elaborate its members. Errors are reported to the diagnostic queue
    /// (suppressed when the request is gagged) and also returned.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(decl = request.decl.raw(), depth = chain.depth(), gagged = request.gagged)
    )]
    pub fn instantiate<S: Semantic + ?Sized>(
        &mut self,
        sema: &mut S,
        request: &Request,
        chain: Chain<'_>,
    ) -> Result<InstanceId, TemplateError> {
        let mark = request.gagged.then(|| self.diagnostics.push_gag());
        let result = ensure_sufficient_stack(|| self.instantiate_inner(sema, request, chain));
        if let Some(mark) = mark {
            let suppressed = self.diagnostics.pop_gag(mark);
            if suppressed > 0 {
                tracing::debug!(suppressed, "gagged errors suppressed");
            }
        }
        result
    }

    /// Instantiate a mixin into `target`. Its members are spliced into the
    /// aggregate through [`Semantic::inject_member`].
    #[tracing::instrument(level = "debug", skip_all, fields(decl = request.decl.raw()))]
    pub fn instantiate_mixin<S: Semantic + ?Sized>(
        &mut self,
        sema: &mut S,
        request: &Request,
        target: MixinTarget,
        chain: Chain<'_>,
    ) -> Result<InstanceId, TemplateError> {
        let request = request.clone().into_mixin(target);
        self.instantiate(sema, &request, chain)
    }

    /// Note that a member of `id` imports `module`.
    pub fn record_import(&mut self, id: InstanceId, module: ModuleId) {
        self.instances[id.index()].imported_modules.insert(module);
    }

    fn instantiate_inner<S: Semantic + ?Sized>(
        &mut self,
        sema: &mut S,
        request: &Request,
        chain: Chain<'_>,
    ) -> Result<InstanceId, TemplateError> {
        self.stats.requests += 1;

        let resolved = match resolve_args(sema, &request.args, request.scope) {
            Ok(args) => args,
            Err(failure) => {
                return Err(self.report(&*sema, TemplateError::Semantic(failure), chain));
            }
        };
        if resolved.iter().any(Argument::contains_error) {
            let failure = SemanticFailure::new("template argument has errors", request.span);
            return Err(self.report(&*sema, TemplateError::Semantic(failure), chain));
        }

        let selected = self.select(
            sema,
            request.decl,
            &resolved,
            request.receiver.as_ref(),
            request.module,
        );
        let (decl_id, deduction) = match selected {
            Ok(found) => found,
            Err(why) => {
                let err = self.selection_error(&*sema, request, &resolved, why);
                return Err(self.report(&*sema, err, chain));
            }
        };

        let decl = &self.decls[decl_id.index()];
        if decl.is_mixin_only() && request.mixin.is_none() {
            let err = TemplateError::MixinOnly {
                template: self.interner.lookup(decl.name).to_string(),
                span: request.span,
            };
            return Err(self.report(&*sema, err, chain));
        }

        let enclosing = match request.mixin {
            Some(target) => Some(target.scope),
            None => match enclosing_scope(&*sema, &deduction.args) {
                Ok(scope) => scope,
                Err(local) => {
                    let err = self.mixed_locals_error(&*sema, request, &resolved, local);
                    return Err(self.report(&*sema, err, chain));
                }
            },
        };

        if let Some(frame) = chain.find_attempt(decl_id, &deduction.args, enclosing) {
            let target = frame.instance;
            if request.need == Need::Reference {
                if let Some(requester) = chain.innermost_instance() {
                    if requester != target {
                        self.defer(requester, target);
                    }
                }
                tracing::debug!(instance = target.raw(), "reference to instance in progress");
                return Ok(target);
            }
            tracing::debug!(instance = target.raw(), "recursive expansion rejected");
            let err = TemplateError::RecursiveExpansion {
                instance: self.display(&*sema, target),
                span: request.span,
            };
            return Err(self.report(&*sema, err, chain));
        }

        let key = Key {
            hash: content_hash(&deduction.args, enclosing),
            enclosing,
        };
        if let Some(id) = self.lookup(decl_id, key, &deduction.args) {
            return self.reuse(&*sema, id, request, chain);
        }

        // only a new instance deepens the chain
        if chain.depth() >= self.config.recursion_limit {
            let err = TemplateError::NestingDepthExceeded {
                instance: self.request_name(&*sema, request),
                limit: self.config.recursion_limit,
                span: request.span,
            };
            return Err(self.report(&*sema, err, chain));
        }

        let id = self.create(decl_id, key, resolved, deduction, request, chain);
        self.elaborate(sema, id, request, chain)
    }

    fn lookup(&mut self, decl: DeclId, key: Key, args: &[Argument]) -> Option<InstanceId> {
        let instances = &self.instances;
        let cache = &self.decls[decl.index()].cache;
        let found = cache.find(key.hash, |id| {
            let inst = &instances[id.index()];
            inst.enclosing == key.enclosing && inst.deduced == args
        });
        if found.is_none() && cache.bucket_len(key.hash) > 0 {
            self.stats.collisions += 1;
            tracing::debug!(hash = key.hash, "instance hash collision");
        }
        found
    }

    fn reuse<S: Semantic + ?Sized>(
        &mut self,
        sema: &S,
        id: InstanceId,
        request: &Request,
        chain: Chain<'_>,
    ) -> Result<InstanceId, TemplateError> {
        self.stats.cache_hits += 1;
        match self.instances[id.index()].state {
            InstanceState::Errored => {
                // reported when it first failed
                return Err(TemplateError::MemberElaborationFailed {
                    instance: id,
                    name: self.display(sema, id),
                    reason: None,
                    span: request.span,
                });
            }
            // still elaborating but missing from `chain`
            InstanceState::Elaborating if request.need == Need::Members => {
                tracing::debug!(instance = id.raw(), "in-progress instance reached off the chain");
                let err = TemplateError::RecursiveExpansion {
                    instance: self.display(sema, id),
                    span: request.span,
                };
                return Err(self.report(sema, err, chain));
            }
            InstanceState::Elaborating | InstanceState::Suspended | InstanceState::Complete => {}
        }
        let speculative = self.diagnostics.is_gagged();
        let is_root = self.root_modules.contains(&request.module);
        let inst = &mut self.instances[id.index()];
        if !speculative {
            inst.flags.remove(InstanceFlags::GAGGED);
            if inst.first_module.is_none() && is_root {
                inst.first_module = Some(request.module);
            }
        }
        tracing::trace!(instance = id.raw(), "instance cache hit");
        Ok(id)
    }

    fn create(
        &mut self,
        decl_id: DeclId,
        key: Key,
        resolved: Vec<Argument>,
        deduction: Deduction,
        request: &Request,
        chain: Chain<'_>,
    ) -> InstanceId {
        let speculative = self.diagnostics.is_gagged();
        let mut flags = InstanceFlags::empty();
        flags.set(InstanceFlags::GAGGED, speculative);
        flags.set(InstanceFlags::MIXIN, request.mixin.is_some());
        let first_module =
            (!speculative && self.root_modules.contains(&request.module)).then_some(request.module);

        let id = InstanceId::new(arena_index(self.instances.len()));
        let decl = &mut self.decls[decl_id.index()];
        decl.cache.insert(key.hash, id);
        self.instances.push(Instance {
            decl: decl_id,
            name: decl.name,
            span: request.span,
            supplied: request.args.clone(),
            resolved,
            deduced: deduction.args,
            level: deduction.level,
            enclosing: key.enclosing,
            hash: key.hash,
            flags,
            state: InstanceState::Elaborating,
            param_scope: None,
            members: None,
            alias_member: None,
            module_of: request.module,
            first_module,
            enclosing_instance: chain.innermost_instance(),
            imported_modules: FxHashSet::default(),
            mixin_target: request.mixin.map(|m| m.aggregate),
            deferred: SmallVec::new(),
            waiting_on: 0,
        });
        self.stats.created += 1;
        tracing::debug!(instance = id.raw(), decl = decl_id.raw(), "instance created");
        id
    }

    fn elaborate<S: Semantic + ?Sized>(
        &mut self,
        sema: &mut S,
        id: InstanceId,
        request: &Request,
        chain: Chain<'_>,
    ) -> Result<InstanceId, TemplateError> {
        let inst = &self.instances[id.index()];
        let decl_id = inst.decl;
        let decl = &self.decls[decl_id.index()];
        let scope = sema.open_scope(decl.scope);
        for (param, arg) in decl.params.iter().zip(&inst.deduced) {
            param.declare(sema, scope, arg);
        }
        let args = inst.deduced.clone();
        let enclosing = inst.enclosing;
        self.instances[id.index()].param_scope = Some(scope);

        let frame = Frame::new(chain, decl_id, id, &args, enclosing, request.span);
        match sema.elaborate_members(self, Chain::from(&frame), id) {
            Ok(members) => {
                self.complete(sema, id, members, request);
                Ok(id)
            }
            Err(failure) => Err(self.fail(sema, id, &failure, request.span, chain)),
        }
    }

    fn complete<S: Semantic + ?Sized>(
        &mut self,
        sema: &mut S,
        id: InstanceId,
        members: MemberTable,
        request: &Request,
    ) {
        let decl = &self.decls[self.instances[id.index()].decl.index()];
        let alias = if decl.is_eponymous() {
            members.find(decl.name).map(|m| m.symbol)
        } else {
            None
        };
        if let Some(target) = request.mixin {
            for member in members.iter() {
                sema.inject_member(target.aggregate, member);
            }
        }

        let inst = &mut self.instances[id.index()];
        inst.alias_member = alias;
        inst.members = Some(members);
        if inst.waiting_on > 0 {
            inst.state = InstanceState::Suspended;
            tracing::debug!(instance = id.raw(), waiting_on = inst.waiting_on, "instance suspended");
        } else {
            inst.state = InstanceState::Complete;
            self.release_deferred(sema, id);
        }
    }

    /// Mark `id` errored and report it. Gagged failures leave the cache.
    fn fail<S: Semantic + ?Sized>(
        &mut self,
        sema: &mut S,
        id: InstanceId,
        failure: &SemanticFailure,
        span: Span,
        chain: Chain<'_>,
    ) -> TemplateError {
        let inst = &mut self.instances[id.index()];
        inst.state = InstanceState::Errored;
        let (decl, hash, gagged) = (inst.decl, inst.hash, inst.is_gagged());
        if gagged && self.decls[decl.index()].cache.remove(hash, id) {
            self.stats.evicted += 1;
            tracing::debug!(instance = id.raw(), "failed speculative instance evicted");
        }
        let err = TemplateError::MemberElaborationFailed {
            instance: id,
            name: self.display(&*sema, id),
            reason: Some(failure.message.clone()),
            span,
        };
        let err = self.report(&*sema, err, chain);
        self.release_deferred(sema, id);
        err
    }

    /// Park `requester` until `target` completes.
    fn defer(&mut self, requester: InstanceId, target: InstanceId) {
        let deferred = &mut self.instances[target.index()].deferred;
        if deferred.contains(&requester) {
            return;
        }
        deferred.push(requester);
        self.instances[requester.index()].waiting_on += 1;
        tracing::debug!(
            requester = requester.raw(),
            target = target.raw(),
            "instance deferred"
        );
    }

    /// Resume every instance that was only waiting on `done`.
    fn release_deferred<S: Semantic + ?Sized>(&mut self, sema: &mut S, done: InstanceId) {
        let mut worklist = std::mem::take(&mut self.instances[done.index()].deferred).into_vec();
        while let Some(waiter) = worklist.pop() {
            let inst = &mut self.instances[waiter.index()];
            inst.waiting_on = inst.waiting_on.saturating_sub(1);
            if inst.waiting_on > 0 || inst.state != InstanceState::Suspended {
                continue;
            }
            tracing::debug!(instance = waiter.raw(), "resuming deferred instance");
            match sema.resume(self, waiter) {
                Ok(()) => self.instances[waiter.index()].state = InstanceState::Complete,
                Err(failure) => {
                    let span = self.instances[waiter.index()].span;
                    let inst = &mut self.instances[waiter.index()];
                    inst.state = InstanceState::Errored;
                    let (decl, hash, gagged) = (inst.decl, inst.hash, inst.is_gagged());
                    if gagged && self.decls[decl.index()].cache.remove(hash, waiter) {
                        self.stats.evicted += 1;
                    }
                    let err = TemplateError::MemberElaborationFailed {
                        instance: waiter,
                        name: self.display(&*sema, waiter),
                        reason: Some(failure.message),
                        span,
                    };
                    self.report(&*sema, err, Chain::EMPTY);
                }
            }
            worklist.extend(std::mem::take(&mut self.instances[waiter.index()].deferred));
        }
    }

    /// Send `err` to the diagnostic queue with the trace of `chain`.
    fn report<S: Semantic + ?Sized>(
        &mut self,
        sema: &S,
        err: TemplateError,
        chain: Chain<'_>,
    ) -> TemplateError {
        let names = |sym: SymbolId| sema.symbol_name(sym);
        let printer = self.printer(&names);
        let entries: Vec<TraceEntry> = chain
            .iter()
            .map(|frame| TraceEntry {
                decl: frame.decl,
                name: printer.instance(
                    self.decls[frame.decl.index()].name,
                    &self.instances[frame.instance.index()].resolved,
                ),
                span: frame.span,
            })
            .collect();
        let trace = format_trace(&entries, self.config.trace_max_shown);
        tracing::debug!(code = %err.code(), %err, "template error");
        self.diagnostics.add(err.to_diagnostic(&trace));
        err
    }

    fn request_name<S: Semantic + ?Sized>(&self, sema: &S, request: &Request) -> String {
        let names = |sym: SymbolId| sema.symbol_name(sym);
        self.printer(&names)
            .request(self.decls[request.decl.index()].name, &request.args)
    }

    fn selection_error<S: Semantic + ?Sized>(
        &self,
        sema: &S,
        request: &Request,
        resolved: &[Argument],
        why: SelectError,
    ) -> TemplateError {
        let names = |sym: SymbolId| sema.symbol_name(sym);
        let printer = self.printer(&names);
        let instance = printer.instance(self.decls[request.decl.index()].name, resolved);
        let span = request.span;
        match why {
            SelectError::Ambiguous(a, b) => TemplateError::AmbiguousOverload {
                instance,
                first: printer.signature(&self.decls[a.index()]),
                second: printer.signature(&self.decls[b.index()]),
                declared: [self.decls[a.index()].span, self.decls[b.index()].span],
                span,
            },
            SelectError::NoMatch(rejected) => {
                let all_constraints = !rejected.is_empty()
                    && rejected
                        .iter()
                        .all(|(_, why)| matches!(why, Rejection::Constraint { .. }));
                match rejected.as_slice() {
                    [(id, Rejection::Constraint { failure }), ..] if all_constraints => {
                        TemplateError::ConstraintFailed {
                            instance,
                            template: printer.signature(&self.decls[id.index()]),
                            reason: failure.as_ref().map(|f| f.message.clone()),
                            span,
                        }
                    }
                    [(id, why)] => {
                        let decl = &self.decls[id.index()];
                        TemplateError::ArgumentMismatch {
                            template: printer.signature(decl),
                            instance,
                            reason: why.describe(decl, &self.interner),
                            span,
                        }
                    }
                    _ => TemplateError::NoMatchingOverload {
                        instance,
                        candidates: rejected
                            .iter()
                            .map(|(id, why)| {
                                let decl = &self.decls[id.index()];
                                format!(
                                    "{} ({})",
                                    printer.signature(decl),
                                    why.describe(decl, &self.interner)
                                )
                            })
                            .collect(),
                        span,
                    },
                }
            }
        }
    }

    fn mixed_locals_error<S: Semantic + ?Sized>(
        &self,
        sema: &S,
        request: &Request,
        resolved: &[Argument],
        local: SymbolId,
    ) -> TemplateError {
        let names = |sym: SymbolId| sema.symbol_name(sym);
        let printer = self.printer(&names);
        let decl = &self.decls[request.decl.index()];
        TemplateError::ArgumentMismatch {
            template: printer.signature(decl),
            instance: printer.instance(decl.name, resolved),
            reason: format!(
                "local `{}` belongs to a different function than the other local arguments",
                self.interner.lookup(sema.symbol_name(local))
            ),
            span: request.span,
        }
    }
}

/// Resolve call-site arguments once, splicing sequences.
fn resolve_args<S: Semantic + ?Sized>(
    sema: &mut S,
    args: &[TemplateArg],
    scope: ScopeId,
) -> Result<Vec<Argument>, SemanticFailure> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        resolve_into(sema, arg, scope, &mut out)?;
    }
    Ok(out)
}

fn resolve_into<S: Semantic + ?Sized>(
    sema: &mut S,
    arg: &TemplateArg,
    scope: ScopeId,
    out: &mut Vec<Argument>,
) -> Result<(), SemanticFailure> {
    match arg {
        TemplateArg::Type(ty) => out.push(Argument::Type(sema.resolve_type(ty, scope)?)),
        TemplateArg::Value(value) => out.push(Argument::Value(value.clone())),
        TemplateArg::Expr(expr) => out.push(Argument::Value(sema.evaluate(*expr, scope)?)),
        TemplateArg::Symbol(sym) => out.push(Argument::Alias(sema.canonical_symbol(*sym))),
        TemplateArg::Tuple(items) => {
            for item in items {
                resolve_into(sema, item, scope, out)?;
            }
        }
    }
    Ok(())
}

/// The one function scope every local alias argument belongs to.
/// `Err` names a local from a second, different scope.
fn enclosing_scope<S: Semantic + ?Sized>(
    sema: &S,
    args: &[Argument],
) -> Result<Option<ScopeId>, SymbolId> {
    let mut found = None;
    let symbols = args.iter().flat_map(|arg| match arg {
        Argument::Tuple(tuple) => tuple.as_slice(),
        other => std::slice::from_ref(other),
    });
    for arg in symbols {
        let Argument::Alias(sym) = arg else {
            continue;
        };
        match (found, sema.local_context(*sym)) {
            (_, None) => {}
            (None, Some(ctx)) => found = Some(ctx),
            (Some(prev), Some(ctx)) if prev != ctx => return Err(*sym),
            (Some(_), Some(_)) => {}
        }
    }
    Ok(found)
}
