//! Handles used throughout the engine.
//!
//! `DeclId` and `InstanceId` index arenas owned by [`Engine`](crate::Engine).
//! `SymbolId`, `ScopeId`, `ModuleId` and `ExprId` are opaque handles owned by
//! the semantic service; the engine only stores and compares them.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from its raw value.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw u32 value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            #[allow(dead_code, reason = "not every handle type indexes an arena")]
            pub(crate) const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// A template declaration in the engine's arena.
    DeclId
);
define_id!(
    /// A template instance in the engine's arena.
    InstanceId
);
define_id!(
    /// A symbol owned by the semantic service.
    ///
    /// Handles with the top bit set are reserved for ranking placeholders
    /// (see [`SymbolId::placeholder`]).
    SymbolId
);
define_id!(
    /// A lexical scope owned by the semantic service.
    ScopeId
);
define_id!(
    /// A module (translation unit).
    ModuleId
);
define_id!(
    /// An unevaluated expression owned by the semantic service.
    ExprId
);
define_id!(
    /// Position of a parameter in its declaration's parameter list.
    ParamIdx
);

impl ParamIdx {
    pub(crate) fn from_usize(index: usize) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "parameter lists are far shorter than u32::MAX"
        )]
        let raw = index as u32;
        ParamIdx(raw)
    }
}

/// Opaque stand-in for a parameter of one declaration.
///
/// The ranker feeds these to another declaration to ask "could you accept
/// anything I accept?". A placeholder only ever equals itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Placeholder {
    pub decl: DeclId,
    pub param: ParamIdx,
}

impl SymbolId {
    const PLACEHOLDER_BIT: u32 = 1 << 31;

    /// Symbol handle standing for an alias parameter during ranking.
    ///
    /// Packs 23 bits of declaration index and 8 bits of parameter index.
    pub const fn placeholder(p: Placeholder) -> Self {
        SymbolId(Self::PLACEHOLDER_BIT | ((p.decl.0 & 0x007F_FFFF) << 8) | (p.param.0 & 0xFF))
    }

    /// Check if this handle was produced by [`SymbolId::placeholder`].
    #[inline]
    pub const fn is_placeholder(self) -> bool {
        self.0 & Self::PLACEHOLDER_BIT != 0
    }
}
