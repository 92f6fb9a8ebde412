//! Entity handles.
//!
//! An entity's data (parent, scene, children, components) lives in the
//! world's arena. Relations between entities are stored as [`EntityId`]
//! handles, so the tree holds no owning pointers.

use std::fmt;

/// Handle of an entity in a world's arena.
///
/// A world issues handles in increasing order from [`EntityId::FIRST`] and
/// never reissues one, so a stale handle misses instead of aliasing a newer
/// entity. `EntityId(0)` is never issued and always misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The first handle a world issues.
    pub const FIRST: EntityId = EntityId(1);

    /// The handle issued after this one.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
