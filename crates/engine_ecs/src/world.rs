//! The world: entity directory, component storage and the entity tree.
//!
//! Every entity lives in the [`World`]'s arena, keyed by [`EntityId`].
//! Parent, child and scene links are plain ids, so the tree has no
//! ownership cycles. All mutation goes through `World` methods, which keep
//! the interest sets in step and run awake/destroy systems.

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use engine_component::{
    Component, ComponentSlot, ComponentTypeId, Detached, EntityId,
};
use tracing::{debug, error, info, warn};

use crate::entity::{Entity, EntityKind, Plain, Scene};
use crate::interest::InterestTracker;
use crate::message::Envelope;
use crate::pool::ObjectPool;
use crate::registry::SystemRegistry;

/// Owns every entity and the system registry.
pub struct World {
    next_id: EntityId,
    pub(crate) entities: HashMap<EntityId, Entity>,
    pub(crate) registry: Rc<SystemRegistry>,
    pub(crate) interest: InterestTracker,
    pub(crate) id_pool: Rc<ObjectPool<Vec<EntityId>>>,
    type_pool: Rc<ObjectPool<Vec<ComponentTypeId>>>,
    pub(crate) mailbox: VecDeque<Envelope>,
}

impl World {
    /// Build a world around a finished registry.
    #[must_use]
    pub fn new(registry: SystemRegistry) -> Self {
        let interest = InterestTracker::new(&registry);
        info!(registry = ?registry, "world created");
        Self {
            next_id: EntityId::FIRST,
            entities: HashMap::new(),
            registry: Rc::new(registry),
            interest,
            id_pool: Rc::new(ObjectPool::new()),
            type_pool: Rc::new(ObjectPool::new()),
            mailbox: VecDeque::new(),
        }
    }

    /// The registry this world dispatches to.
    #[must_use]
    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    /// Look up an entity. Entities mid-dispose are still visible, with
    /// [`Entity::is_disposed`] set.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Returns `true` if `id` is in the directory.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities in the directory.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Append every entity id to `out`, in ascending order.
    pub fn entity_ids(&self, out: &mut Vec<EntityId>) {
        let start = out.len();
        out.extend(self.entities.keys().copied());
        out[start..].sort_unstable();
    }

    fn live(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).filter(|e| !e.disposed)
    }

    // ---- spawning ---------------------------------------------------------

    /// Create a [`Plain`] entity.
    pub fn spawn(&mut self) -> EntityId {
        self.spawn_kind::<Plain>()
    }

    /// Create a [`Scene`] entity.
    pub fn spawn_scene(&mut self) -> EntityId {
        self.spawn_kind::<Scene>()
    }

    /// Create an entity of kind `K`.
    pub fn spawn_kind<K: EntityKind>(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = id.successor();
        let entity = Entity::new::<K>(id);
        debug!(entity = %id, kind = entity.kind_name(), "spawned entity");
        self.entities.insert(id, entity);
        self.refresh_interest(id);
        id
    }

    // ---- components -------------------------------------------------------

    /// Attach `component` and run the matching awake systems with no args.
    ///
    /// Returns the stored component, or `None` if the entity is missing or
    /// disposed, a `C` is already attached, or an awake system removed it
    /// again.
    pub fn add_component<C: Component>(&mut self, entity: EntityId, component: C) -> Option<&mut C> {
        self.add_component_with(entity, component, ())
    }

    /// Attach `component` and run the awake systems whose args type is `A`.
    ///
    /// A duplicate add is refused: the existing component stays and the new
    /// value is dropped.
    pub fn add_component_with<C: Component, A: 'static>(
        &mut self,
        entity: EntityId,
        component: C,
        args: A,
    ) -> Option<&mut C> {
        let Some(node) = self.entities.get_mut(&entity).filter(|e| !e.disposed) else {
            warn!(entity = %entity, component = C::type_name(), "add to missing or disposed entity");
            return None;
        };
        if node.components.insert(ComponentSlot::new(entity, component)).is_err() {
            error!(entity = %entity, component = C::type_name(), "component already attached");
            return None;
        }
        debug!(entity = %entity, component = C::type_name(), "component added");

        self.refresh_interest(entity);
        self.awake_component::<C, A>(entity, &args);
        self.get_component_mut::<C>(entity)
    }

    /// Like [`World::add_component`], but first removes (and destroys) an
    /// existing `C`.
    pub fn add_or_replace_component<C: Component>(
        &mut self,
        entity: EntityId,
        component: C,
    ) -> Option<&mut C> {
        self.add_or_replace_component_with(entity, component, ())
    }

    /// Like [`World::add_component_with`], but first removes (and destroys)
    /// an existing `C`. The removal runs destroy systems with no args.
    pub fn add_or_replace_component_with<C: Component, A: 'static>(
        &mut self,
        entity: EntityId,
        component: C,
        args: A,
    ) -> Option<&mut C> {
        if self.has_component::<C>(entity) {
            self.remove_component::<C>(entity);
        }
        self.add_component_with(entity, component, args)
    }

    /// Detach the `C` component and run destroy systems with no args.
    pub fn remove_component<C: Component>(&mut self, entity: EntityId) -> Option<Detached<C>> {
        self.remove_component_with::<C, ()>(entity, ())
    }

    /// Detach the `C` component and run the destroy systems whose args type
    /// is `A`.
    ///
    /// The returned value is flagged disposed. `None` when nothing was
    /// attached.
    pub fn remove_component_with<C: Component, A: 'static>(
        &mut self,
        entity: EntityId,
        args: A,
    ) -> Option<Detached<C>> {
        let node = self.entities.get_mut(&entity).filter(|e| !e.disposed)?;
        let slot = node.components.remove(ComponentTypeId::of::<C>())?;
        debug!(entity = %entity, component = C::type_name(), "component removed");

        let slot = self.destroy_component(entity, slot, &args, TypeId::of::<A>());
        match slot.into_detached::<C>() {
            Ok(detached) => Some(detached),
            Err(slot) => {
                error!(entity = %entity, slot = ?slot, "component slot holds the wrong type");
                None
            }
        }
    }

    /// Borrow the `C` component of `entity`.
    #[must_use]
    pub fn get_component<C: Component>(&self, entity: EntityId) -> Option<&C> {
        self.entities.get(&entity)?.components.get::<C>()
    }

    /// Mutably borrow the `C` component of `entity`.
    ///
    /// Changing a value that a tick predicate reads needs a follow-up
    /// [`World::refresh_interest`].
    pub fn get_component_mut<C: Component>(&mut self, entity: EntityId) -> Option<&mut C> {
        self.entities.get_mut(&entity)?.components.get_mut::<C>()
    }

    /// Returns `true` if `entity` has a `C` component.
    #[must_use]
    pub fn has_component<C: Component>(&self, entity: EntityId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|e| e.components.has::<C>())
    }

    // ---- hierarchy --------------------------------------------------------

    /// Make `child` the last child of `parent`, detaching it from any
    /// previous parent.
    ///
    /// Refused when either entity is missing or disposed, or when `child` is
    /// `parent` itself or one of its ancestors.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) {
        if self.live(parent).is_none() || self.live(child).is_none() {
            warn!(parent = %parent, child = %child, "add_child on missing or disposed entity");
            return;
        }
        if self.is_ancestor_or_self(child, parent) {
            warn!(parent = %parent, child = %child, "add_child would create a cycle");
            return;
        }
        if let Some(previous) = self.entities.get(&child).and_then(Entity::parent) {
            self.remove_child(previous, child);
        }
        if let Some(node) = self.entities.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.entities.get_mut(&child) {
            node.parent = Some(parent);
        }
        debug!(parent = %parent, child = %child, "child attached");
        self.refresh_interest(child);
    }

    /// Detach `child` from `parent`. No-op if it is not a child.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) {
        let Some(node) = self.entities.get_mut(&parent) else {
            return;
        };
        let Some(pos) = node.children.iter().position(|&c| c == child) else {
            return;
        };
        node.children.remove(pos);
        if let Some(node) = self.entities.get_mut(&child)
            && node.parent == Some(parent)
        {
            node.parent = None;
        }
        debug!(parent = %parent, child = %child, "child detached");
        self.refresh_interest(child);
    }

    /// The child `id` of `parent`, if it is a direct child of kind `K`.
    #[must_use]
    pub fn find_child<K: EntityKind>(&self, parent: EntityId, id: EntityId) -> Option<EntityId> {
        let node = self.entities.get(&parent)?;
        if !node.children.contains(&id) {
            return None;
        }
        self.entities
            .get(&id)
            .filter(|e| e.is::<K>())
            .map(Entity::id)
    }

    /// The first direct child of kind `K` accepted by `pred`.
    pub fn find_child_by<K, F>(&self, parent: EntityId, mut pred: F) -> Option<EntityId>
    where
        K: EntityKind,
        F: FnMut(&Entity) -> bool,
    {
        let node = self.entities.get(&parent)?;
        node.children
            .iter()
            .filter_map(|id| self.entities.get(id))
            .find(|e| e.is::<K>() && pred(e))
            .map(Entity::id)
    }

    /// Append every direct child of kind `K` to `out`, in child order.
    pub fn find_children<K: EntityKind>(&self, parent: EntityId, out: &mut Vec<EntityId>) {
        let Some(node) = self.entities.get(&parent) else {
            return;
        };
        out.extend(
            node.children
                .iter()
                .filter(|&&id| self.entities.get(&id).is_some_and(|e| e.is::<K>())),
        );
    }

    fn is_ancestor_or_self(&self, candidate: EntityId, of: EntityId) -> bool {
        let mut cursor = Some(of);
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            cursor = self.entities.get(&id).and_then(Entity::parent);
        }
        false
    }

    // ---- disposal ---------------------------------------------------------

    /// Dispose `id` and everything it owns.
    ///
    /// In order: scene members (for scenes, while the scene itself is still
    /// live), children last to first, then components (every destroy system
    /// for the type runs), then the entity leaves its parent, its scene,
    /// every interest set and the directory.
    /// Idempotent; unknown ids are ignored.
    pub fn dispose(&mut self, id: EntityId) {
        let Some(node) = self.entities.get_mut(&id) else {
            return;
        };
        if node.disposing {
            return;
        }
        node.disposing = true;
        let is_scene = node.is_scene();
        debug!(entity = %id, kind = node.kind_name(), "disposing entity");

        if is_scene {
            let mut members = self.id_pool.obtain();
            if let Some(set) = self.entities.get(&id).and_then(Entity::scene_members) {
                members.extend(set.iter().copied());
            }
            for &member in members.iter() {
                self.dispose(member);
            }
        }
        if let Some(node) = self.entities.get_mut(&id) {
            node.disposed = true;
        }

        while let Some(child) = self.take_last_child(id) {
            self.dispose(child);
        }

        let mut types = self.type_pool.obtain();
        if let Some(node) = self.entities.get(&id) {
            node.components.type_ids_into(&mut types);
        }
        for &ty in types.iter() {
            let Some(slot) = self
                .entities
                .get_mut(&id)
                .and_then(|node| node.components.remove(ty))
            else {
                continue;
            };
            drop(self.dispose_component(id, slot));
        }

        if let Some(parent) = self.entities.get(&id).and_then(Entity::parent) {
            self.remove_child(parent, id);
        }
        if let Some(scene) = self.entities.get(&id).and_then(Entity::scene) {
            self.scene_remove_entity(scene, id);
        }
        self.interest.purge(id);
        self.entities.remove(&id);
    }

    fn take_last_child(&mut self, id: EntityId) -> Option<EntityId> {
        let child = self.entities.get_mut(&id)?.children.pop()?;
        if let Some(node) = self.entities.get_mut(&child)
            && node.parent == Some(id)
        {
            node.parent = None;
        }
        Some(child)
    }

    /// Dispose every entity and drop queued messages.
    pub fn shutdown(&mut self) {
        let mut ids = self.id_pool.obtain();
        self.entity_ids(&mut ids);
        info!(entities = ids.len(), "world shutting down");
        for &id in ids.iter() {
            self.dispose(id);
        }
        self.mailbox.clear();
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("registry", &self.registry)
            .field("queued_messages", &self.mailbox.len())
            .finish_non_exhaustive()
    }
}
