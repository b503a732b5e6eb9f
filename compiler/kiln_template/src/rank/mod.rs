//! Partial ordering of overloads by specialization.
//!
//! `A` is at least as specialized as `B` when `B` accepts the arguments
//! obtained by instantiating `A`'s parameters with opaque placeholders.
//! Each placeholder only equals itself, so `B` can accept them only if its
//! patterns are no more demanding than `A`'s.

use crate::argument::Argument;
use crate::decl::TemplateDecl;
use crate::ids::{DeclId, ParamIdx};
use crate::matcher::{match_declaration, MatchLevel, MatchMode};
use crate::param::{ParamKind, ValueParam};
use crate::semantic::Semantic;
use crate::ty::Type;


/// Outcome of comparing two candidates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Order {
    /// Neither accepts the other's arguments.
    Incompatible,
    /// The first is strictly less specialized.
    MoreGeneral,
    /// The first is strictly more specialized.
    MoreSpecific,
    /// Each accepts the other's arguments.
    Ambiguous,
}

impl Order {
    pub fn reverse(self) -> Order {
        match self {
            Order::MoreGeneral => Order::MoreSpecific,
            Order::MoreSpecific => Order::MoreGeneral,
            other => other,
        }
    }
}

/// Arguments standing for "anything `decl` accepts", plus the receiver for
/// a `this` parameter.
fn placeholder_args<S: Semantic + ?Sized>(
    sema: &mut S,
    decl: &TemplateDecl,
    id: DeclId,
) -> (Vec<Argument>, Option<Type>) {
    let mut args = Vec::with_capacity(decl.params.len());
    let mut receiver = None;
    for (i, param) in decl.params.iter().enumerate() {
        // later parameters are pinned through earlier ones
        if param.dependent || param.is_tuple() {
            break;
        }
        let idx = ParamIdx::from_usize(i);
        let spec_value = match &param.kind {
            ParamKind::Value(ValueParam {
                spec: Some(expr), ..
            }) => sema.evaluate(*expr, decl.scope).ok(),
            _ => None,
        };
        let dummy = param.dummy_arg(id, idx, spec_value);
        if param.is_this() {
            receiver = dummy.as_type().cloned();
        } else {
            args.push(dummy);
        }
    }
    (args, receiver)
}

/// Level at which `b` accepts placeholders for `a`'s parameters.
pub fn least_as_specialized<S: Semantic + ?Sized>(
    sema: &mut S,
    (a_id, a): (DeclId, &TemplateDecl),
    (b_id, b): (DeclId, &TemplateDecl),
) -> MatchLevel {
    let (args, receiver) = placeholder_args(sema, a, a_id);
    let level = match match_declaration(sema, b, b_id, &args, receiver.as_ref(), MatchMode::Rank) {
        Ok(deduction) => deduction.level,
        Err(_) => MatchLevel::NoMatch,
    };
    // a fixed arity is more specialized than an open sequence
    if level > MatchLevel::NoMatch && a.is_open_variadic() && b.variadic().is_none() {
        return MatchLevel::NoMatch;
    }
    tracing::trace!(a = a_id.raw(), b = b_id.raw(), ?level, "least as specialized");
    level
}

/// Compare two candidates by specialization.
pub fn compare<S: Semantic + ?Sized>(
    sema: &mut S,
    a: (DeclId, &TemplateDecl),
    b: (DeclId, &TemplateDecl),
) -> Order {
    let a_fits_b = least_as_specialized(sema, a, b) > MatchLevel::NoMatch;
    let b_fits_a = least_as_specialized(sema, b, a) > MatchLevel::NoMatch;
    match (a_fits_b, b_fits_a) {
        (true, true) => Order::Ambiguous,
        (true, false) => Order::MoreSpecific,
        (false, true) => Order::MoreGeneral,
        (false, false) => Order::Incompatible,
    }
}

/// Candidates that matched a request, with their match levels.
pub struct Candidate<'a> {
    pub id: DeclId,
    pub decl: &'a TemplateDecl,
    pub level: MatchLevel,
}

/// Result of [`select_best`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    Unique(usize),
    /// Indices of two candidates neither of which beats the other.
    Ambiguous(usize, usize),
    Empty,
}

/// Pick the best candidate: highest match level first, then strictly most
/// specialized among those.
pub fn select_best<S: Semantic + ?Sized>(sema: &mut S, candidates: &[Candidate<'_>]) -> Selection {
    let Some(best_level) = candidates.iter().map(|c| c.level).max() else {
        return Selection::Empty;
    };
    let top: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].level == best_level)
        .collect();
    if let [only] = top.as_slice() {
        return Selection::Unique(*only);
    }

    // a candidate survives unless some rival is strictly more specialized
    let mut maximal = Vec::new();
    for &i in &top {
        let dominated = top.iter().any(|&j| {
            j != i
                && compare(
                    sema,
                    (candidates[j].id, candidates[j].decl),
                    (candidates[i].id, candidates[i].decl),
                ) == Order::MoreSpecific
        });
        if !dominated {
            maximal.push(i);
        }
    }
    match maximal.as_slice() {
        [winner] => Selection::Unique(*winner),
        [first, second, ..] => Selection::Ambiguous(*first, *second),
        [] => Selection::Ambiguous(top[0], top[1]),
    }
}
