//! Template instances and their member tables.

use bitflags::bitflags;
use kiln_ir::{Name, Span};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::argument::{Argument, TemplateArg};
use crate::ids::{DeclId, InstanceId, ModuleId, ScopeId, SymbolId};
use crate::matcher::MatchLevel;
use crate::ty::{BasicType, Dim, Type};


/// Size and alignment of a data member.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FieldLayout {
    pub size: u32,
    pub align: u32,
    pub has_pointers: bool,
}

impl FieldLayout {
    const POINTER: FieldLayout = FieldLayout {
        size: 8,
        align: 8,
        has_pointers: true,
    };

    pub fn new(size: u32, align: u32) -> Self {
        FieldLayout {
            size,
            align,
            has_pointers: false,
        }
    }

    /// Layout of a field of type `ty` on a 64-bit target.
    ///
    /// Returns `None` for types whose size the engine cannot know
    /// (nominal types, unresolved patterns).
    pub fn of_type(ty: &Type) -> Option<FieldLayout> {
        match ty {
            Type::Basic(BasicType::Void) => None,
            Type::Basic(b) => Some(FieldLayout::new(b.size(), b.size())),
            Type::Const(inner) => FieldLayout::of_type(inner),
            Type::Pointer(_) => Some(FieldLayout::POINTER),
            // ptr + length
            Type::Array(_) => Some(FieldLayout {
                size: 16,
                ..FieldLayout::POINTER
            }),
            Type::StaticArray(elem, Dim::Known(n)) => {
                let elem = FieldLayout::of_type(elem)?;
                let count = u32::try_from(*n).ok()?;
                Some(FieldLayout {
                    size: elem.size.checked_mul(count)?,
                    ..elem
                })
            }
            Type::StaticArray(..)
            | Type::Named(_)
            | Type::Instance(_)
            | Type::Param(_)
            | Type::Placeholder(_)
            | Type::Error => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Member {
    pub name: Name,
    pub symbol: SymbolId,
    /// Set for data members.
    pub field: Option<FieldLayout>,
}

impl Member {
    pub fn new(name: Name, symbol: SymbolId) -> Self {
        Member {
            name,
            symbol,
            field: None,
        }
    }

    pub fn field(name: Name, symbol: SymbolId, layout: FieldLayout) -> Self {
        Member {
            name,
            symbol,
            field: Some(layout),
        }
    }
}

/// Members produced by elaborating an instance, in declaration order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemberTable {
    members: Vec<Member>,
}

impl MemberTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, member: Member) {
        self.members.push(member);
    }

    pub fn find(&self, name: Name) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.members.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Member, FieldLayout)> {
        self.members
            .iter()
            .filter_map(|m| m.field.map(|layout| (m, layout)))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<Member> for MemberTable {
    fn from_iter<I: IntoIterator<Item = Member>>(iter: I) -> Self {
        MemberTable {
            members: iter.into_iter().collect(),
        }
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct InstanceFlags: u8 {
        /// Created by a speculative request; dropped from the cache on failure.
        const GAGGED = 1 << 0;
        /// Spliced into an aggregate rather than standing alone.
        const MIXIN = 1 << 1;
        /// A module has taken responsibility for emitting code.
        const CODEGEN_CLAIMED = 1 << 2;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InstanceState {
    /// Members are being elaborated right now.
    Elaborating,
    /// Members are done but the instance waits on an in-progress one.
    Suspended,
    Complete,
    Errored,
}

/// One expansion of a declaration with concrete arguments.
#[derive(Debug)]
pub struct Instance {
    pub(crate) decl: DeclId,
    pub(crate) name: Name,
    pub(crate) span: Span,
    pub(crate) supplied: Vec<TemplateArg>,
    pub(crate) resolved: Vec<Argument>,
    pub(crate) deduced: Vec<Argument>,
    pub(crate) level: MatchLevel,
    pub(crate) enclosing: Option<ScopeId>,
    pub(crate) hash: u64,
    pub(crate) flags: InstanceFlags,
    pub(crate) state: InstanceState,
    pub(crate) param_scope: Option<ScopeId>,
    pub(crate) members: Option<MemberTable>,
    pub(crate) alias_member: Option<SymbolId>,
    pub(crate) module_of: ModuleId,
    pub(crate) first_module: Option<ModuleId>,
    pub(crate) enclosing_instance: Option<InstanceId>,
    pub(crate) imported_modules: FxHashSet<ModuleId>,
    pub(crate) mixin_target: Option<SymbolId>,
    /// Instances parked until this one is complete.
    pub(crate) deferred: SmallVec<[InstanceId; 2]>,
    /// In-progress instances this one is parked on.
    pub(crate) waiting_on: u32,
}

impl Instance {
    pub fn decl(&self) -> DeclId {
        self.decl
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Arguments as written at the first requesting site.
    pub fn supplied_args(&self) -> &[TemplateArg] {
        &self.supplied
    }

    /// Supplied arguments after evaluation and flattening.
    pub fn resolved_args(&self) -> &[Argument] {
        &self.resolved
    }

    /// One argument per parameter. The instance's identity.
    pub fn deduced_args(&self) -> &[Argument] {
        &self.deduced
    }

    pub fn match_level(&self) -> MatchLevel {
        self.level
    }

    pub fn enclosing(&self) -> Option<ScopeId> {
        self.enclosing
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn flags(&self) -> InstanceFlags {
        self.flags
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_gagged(&self) -> bool {
        self.flags.contains(InstanceFlags::GAGGED)
    }

    pub fn is_errored(&self) -> bool {
        self.state == InstanceState::Errored
    }

    pub fn param_scope(&self) -> Option<ScopeId> {
        self.param_scope
    }

    pub fn members(&self) -> Option<&MemberTable> {
        self.members.as_ref()
    }

    /// The eponymous member, when the declaration has one.
    pub fn to_alias(&self) -> Option<SymbolId> {
        self.alias_member
    }

    /// Module whose scope issued the first request.
    pub fn module_of(&self) -> ModuleId {
        self.module_of
    }

    /// First root module that needed this instance.
    pub fn first_module(&self) -> Option<ModuleId> {
        self.first_module
    }

    pub fn enclosing_instance(&self) -> Option<InstanceId> {
        self.enclosing_instance
    }

    pub fn imported_modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.imported_modules.iter().copied()
    }

    pub fn mixin_target(&self) -> Option<SymbolId> {
        self.mixin_target
    }
}
