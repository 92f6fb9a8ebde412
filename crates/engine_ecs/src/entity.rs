//! Entity nodes and entity kinds.
//!
//! An [`Entity`] is the arena record behind an [`EntityId`]. It is owned by
//! the [`World`](crate::World); callers get shared views through
//! [`World::entity`](crate::World::entity) and mutate only through `World`
//! methods, so every change goes past the interest tracker.
//!
//! Kinds stand in for entity subclasses. A kind is a marker type; queries such
//! as [`World::find_entities`](crate::World::find_entities) take a kind
//! parameter and keep entities whose kind it matches.

use std::any::TypeId;
use std::collections::BTreeSet;

use engine_component::{Component, ComponentMap, EntityId, short_type_name};

/// Identifies an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKindId(TypeId);

impl EntityKindId {
    /// The id of kind `K`.
    #[must_use]
    pub fn of<K: EntityKind + ?Sized>() -> Self {
        Self(TypeId::of::<K>())
    }
}

/// A marker type naming a category of entities.
///
/// ```rust
/// use engine_ecs::{EntityKind, World, SystemRegistry};
///
/// struct Monster;
/// impl EntityKind for Monster {}
///
/// let mut world = World::new(SystemRegistry::new());
/// let scene = world.spawn_scene();
/// let m = world.spawn_kind::<Monster>();
/// world.scene_add_entity(scene, m);
///
/// let mut found = Vec::new();
/// world.find_entities::<Monster>(scene, &mut found);
/// assert_eq!(found, vec![m]);
/// ```
pub trait EntityKind: 'static {
    /// Returns `true` when an entity of kind `kind` should be treated as `Self`.
    ///
    /// Defaults to exact kind equality.
    fn matches(kind: EntityKindId) -> bool {
        kind == EntityKindId::of::<Self>()
    }
}

/// The kind of entities created by [`World::spawn`](crate::World::spawn).
#[derive(Debug, Clone, Copy)]
pub struct Plain;

impl EntityKind for Plain {}

/// The kind of entities created by [`World::spawn_scene`](crate::World::spawn_scene).
#[derive(Debug, Clone, Copy)]
pub struct Scene;

impl EntityKind for Scene {}

/// Matches entities of every kind.
#[derive(Debug, Clone, Copy)]
pub struct AnyKind;

impl EntityKind for AnyKind {
    fn matches(_: EntityKindId) -> bool {
        true
    }
}

/// An entity record.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    kind: EntityKindId,
    kind_name: &'static str,
    pub(crate) parent: Option<EntityId>,
    pub(crate) scene: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) components: ComponentMap,
    /// Set on entry to dispose; guards re-entry.
    pub(crate) disposing: bool,
    pub(crate) disposed: bool,
    /// Scene registry; `Some` exactly for scene entities.
    pub(crate) members: Option<BTreeSet<EntityId>>,
}

impl Entity {
    pub(crate) fn new<K: EntityKind>(id: EntityId) -> Self {
        let members = (EntityKindId::of::<K>() == EntityKindId::of::<Scene>()).then(BTreeSet::new);
        Self {
            id,
            kind: EntityKindId::of::<K>(),
            kind_name: short_type_name::<K>(),
            parent: None,
            scene: None,
            children: Vec::new(),
            components: ComponentMap::new(),
            disposing: false,
            disposed: false,
            members,
        }
    }

    /// This entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// This entity's kind.
    #[must_use]
    pub fn kind(&self) -> EntityKindId {
        self.kind
    }

    /// This entity's kind name, for logs.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }

    /// Returns `true` if kind `K` matches this entity.
    #[must_use]
    pub fn is<K: EntityKind>(&self) -> bool {
        K::matches(self.kind)
    }

    /// Returns `true` for scene entities.
    #[must_use]
    pub fn is_scene(&self) -> bool {
        self.members.is_some()
    }

    /// The parent entity, if any.
    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// The owning scene, if any.
    #[must_use]
    pub fn scene(&self) -> Option<EntityId> {
        self.scene
    }

    /// Direct children, in insertion order.
    #[must_use]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// The entity's components.
    #[must_use]
    pub fn components(&self) -> &ComponentMap {
        &self.components
    }

    /// Returns `true` if a `C` component is attached.
    #[must_use]
    pub fn has_component<C: Component>(&self) -> bool {
        self.components.has::<C>()
    }

    /// Borrow the `C` component, if attached.
    #[must_use]
    pub fn get_component<C: Component>(&self) -> Option<&C> {
        self.components.get::<C>()
    }

    /// Returns `true` once disposal has started.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The scene registry, for scene entities.
    #[must_use]
    pub fn scene_members(&self) -> Option<&BTreeSet<EntityId>> {
        self.members.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Monster;
    impl EntityKind for Monster {}

    #[test]
    fn test_plain_entity_defaults() {
        let e = Entity::new::<Plain>(EntityId(1));
        assert_eq!(e.id(), EntityId(1));
        assert!(e.is::<Plain>());
        assert!(!e.is::<Scene>());
        assert!(!e.is_scene());
        assert!(e.parent().is_none());
        assert!(e.scene().is_none());
        assert!(e.children().is_empty());
        assert!(!e.is_disposed());
        assert_eq!(e.kind_name(), "Plain");
    }

    #[test]
    fn test_scene_entity_has_registry() {
        let e = Entity::new::<Scene>(EntityId(2));
        assert!(e.is_scene());
        assert!(e.scene_members().is_some_and(BTreeSet::is_empty));
    }

    #[test]
    fn test_any_kind_matches_everything() {
        assert!(Entity::new::<Monster>(EntityId(3)).is::<AnyKind>());
        assert!(Entity::new::<Scene>(EntityId(4)).is::<AnyKind>());
        assert!(!Entity::new::<Monster>(EntityId(3)).is::<Plain>());
    }
}
