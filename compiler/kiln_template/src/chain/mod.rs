//! The chain of instantiations currently in progress.
//!
//! Each nested request pushes a [`Frame`] on the Rust stack and hands the
//! resulting [`Chain`] to the semantic service. The chain is therefore
//! exactly as deep as the live call stack, and popping is automatic.

use kiln_ir::Span;

use crate::argument::Argument;
use crate::ids::{DeclId, InstanceId, ScopeId};


/// One in-progress instantiation.
#[derive(Debug)]
pub struct Frame<'a> {
    parent: Chain<'a>,
    pub decl: DeclId,
    pub instance: InstanceId,
    pub args: &'a [Argument],
    pub enclosing: Option<ScopeId>,
    /// Where the request was made.
    pub span: Span,
    depth: u32,
}

impl<'a> Frame<'a> {
    pub fn new(
        parent: Chain<'a>,
        decl: DeclId,
        instance: InstanceId,
        args: &'a [Argument],
        enclosing: Option<ScopeId>,
        span: Span,
    ) -> Self {
        Frame {
            parent,
            decl,
            instance,
            args,
            enclosing,
            span,
            depth: parent.depth() + 1,
        }
    }

    pub fn parent(&self) -> Chain<'a> {
        self.parent
    }
}

/// Linked stack of [`Frame`]s, innermost first.
#[derive(Copy, Clone, Debug, Default)]
pub struct Chain<'a> {
    top: Option<&'a Frame<'a>>,
}

impl<'a> Chain<'a> {
    /// The chain outside any instantiation.
    pub const EMPTY: Chain<'static> = Chain { top: None };

    pub fn depth(&self) -> u32 {
        self.top.map_or(0, |f| f.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    pub fn innermost(&self) -> Option<&'a Frame<'a>> {
        self.top
    }

    /// The instance whose members are being elaborated right now.
    pub fn innermost_instance(&self) -> Option<InstanceId> {
        self.top.map(|f| f.instance)
    }

    pub fn iter(&self) -> ChainIter<'a> {
        ChainIter { next: self.top }
    }

    /// A frame elaborating `decl` with identical arguments and context.
    pub fn find_attempt(
        &self,
        decl: DeclId,
        args: &[Argument],
        enclosing: Option<ScopeId>,
    ) -> Option<&'a Frame<'a>> {
        self.iter()
            .find(|f| f.decl == decl && f.enclosing == enclosing && f.args == args)
    }

    pub fn contains_instance(&self, instance: InstanceId) -> bool {
        self.iter().any(|f| f.instance == instance)
    }

    /// How many frames are elaborating `decl`.
    pub fn reentrancy(&self, decl: DeclId) -> usize {
        self.iter().filter(|f| f.decl == decl).count()
    }
}

impl<'a> From<&'a Frame<'a>> for Chain<'a> {
    fn from(frame: &'a Frame<'a>) -> Self {
        Chain { top: Some(frame) }
    }
}

pub struct ChainIter<'a> {
    next: Option<&'a Frame<'a>>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.next?;
        self.next = frame.parent.top;
        Some(frame)
    }
}
