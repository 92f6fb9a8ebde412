//! Scene registries.
//!
//! A scene is an entity of kind [`Scene`](crate::Scene) that additionally
//! keeps a flat set of member entities. Membership is independent of the
//! parent/child tree; disposing a scene disposes every member.

use engine_component::{Component, EntityId};
use tracing::{debug, warn};

use crate::entity::{Entity, EntityKind};
use crate::world::World;

impl World {
    /// Register `entity` with `scene`, moving it out of any previous scene.
    ///
    /// Refused when `scene` is not a live scene or `entity` is not live. A
    /// scene stops accepting members as soon as its disposal begins.
    pub fn scene_add_entity(&mut self, scene: EntityId, entity: EntityId) {
        let scene_ok = self
            .entities
            .get(&scene)
            .is_some_and(|s| !s.disposing && s.is_scene());
        let entity_ok = self.entities.get(&entity).is_some_and(|e| !e.disposed);
        if !scene_ok || !entity_ok || scene == entity {
            warn!(scene = %scene, entity = %entity, "scene_add_entity refused");
            return;
        }

        match self.entities.get(&entity).and_then(Entity::scene) {
            Some(current) if current == scene => return,
            Some(current) => self.scene_remove_entity(current, entity),
            None => {}
        }

        let Some(members) = self.entities.get_mut(&scene).and_then(|s| s.members.as_mut()) else {
            return;
        };
        members.insert(entity);
        let count = members.len();
        if let Some(node) = self.entities.get_mut(&entity) {
            node.scene = Some(scene);
        }
        debug!(scene = %scene, entity = %entity, members = count, "entity joined scene");
        self.refresh_interest(entity);
    }

    /// Unregister `entity` from `scene`. No-op if it is not a member.
    pub fn scene_remove_entity(&mut self, scene: EntityId, entity: EntityId) {
        let Some(members) = self.entities.get_mut(&scene).and_then(|s| s.members.as_mut()) else {
            return;
        };
        if !members.remove(&entity) {
            return;
        }
        let count = members.len();
        if let Some(node) = self.entities.get_mut(&entity)
            && node.scene == Some(scene)
        {
            node.scene = None;
        }
        debug!(scene = %scene, entity = %entity, members = count, "entity left scene");
        self.refresh_interest(entity);
    }

    /// Append every member of `scene` to `out`, in id order.
    pub fn scene_entities(&self, scene: EntityId, out: &mut Vec<EntityId>) {
        if let Some(members) = self.entities.get(&scene).and_then(Entity::scene_members) {
            out.extend(members.iter().copied());
        }
    }

    /// Append every member of `scene` whose kind matches `K` to `out`.
    pub fn find_entities<K: EntityKind>(&self, scene: EntityId, out: &mut Vec<EntityId>) {
        self.collect_members(scene, out, Entity::is::<K>);
    }

    /// Append every member of `scene` that has a `C` component to `out`.
    pub fn find_entities_with_component<C: Component>(&self, scene: EntityId, out: &mut Vec<EntityId>) {
        self.collect_members(scene, out, Entity::has_component::<C>);
    }

    fn collect_members(
        &self,
        scene: EntityId,
        out: &mut Vec<EntityId>,
        keep: impl Fn(&Entity) -> bool,
    ) {
        let Some(members) = self.entities.get(&scene).and_then(Entity::scene_members) else {
            return;
        };
        out.extend(
            members
                .iter()
                .filter_map(|id| self.entities.get(id))
                .filter(|e| keep(e))
                .map(Entity::id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Plain;
    use crate::registry::SystemRegistry;

    struct Monster;
    impl EntityKind for Monster {}

    struct Npc;
    impl EntityKind for Npc {}

    struct Loot;
    impl Component for Loot {}

    fn world() -> World {
        World::new(SystemRegistry::new())
    }

    #[test]
    fn test_add_and_query_members() {
        let mut world = world();
        let scene = world.spawn_scene();
        let m = world.spawn_kind::<Monster>();
        let n = world.spawn_kind::<Npc>();
        world.scene_add_entity(scene, m);
        world.scene_add_entity(scene, n);
        world.add_component(n, Loot);

        assert_eq!(world.entity(m).unwrap().scene(), Some(scene));

        let mut out = Vec::new();
        world.find_entities::<Monster>(scene, &mut out);
        assert_eq!(out, vec![m]);

        out.clear();
        world.find_entities_with_component::<Loot>(scene, &mut out);
        assert_eq!(out, vec![n]);

        out.clear();
        world.scene_entities(scene, &mut out);
        assert_eq!(out, vec![m, n]);
    }

    #[test]
    fn test_add_twice_is_single_membership() {
        let mut world = world();
        let scene = world.spawn_scene();
        let e = world.spawn();
        world.scene_add_entity(scene, e);
        world.scene_add_entity(scene, e);
        assert_eq!(world.entity(scene).unwrap().scene_members().unwrap().len(), 1);
    }

    #[test]
    fn test_moving_between_scenes() {
        let mut world = world();
        let a = world.spawn_scene();
        let b = world.spawn_scene();
        let e = world.spawn();
        world.scene_add_entity(a, e);
        world.scene_add_entity(b, e);

        let mut out = Vec::new();
        world.find_entities::<Plain>(a, &mut out);
        assert!(out.is_empty());
        world.find_entities::<Plain>(b, &mut out);
        assert_eq!(out, vec![e]);
        assert_eq!(world.entity(e).unwrap().scene(), Some(b));
    }

    #[test]
    fn test_non_scene_target_refused() {
        let mut world = world();
        let not_scene = world.spawn();
        let e = world.spawn();
        world.scene_add_entity(not_scene, e);
        assert_eq!(world.entity(e).unwrap().scene(), None);
    }

    #[test]
    fn test_remove_clears_scene_link() {
        let mut world = world();
        let scene = world.spawn_scene();
        let e = world.spawn();
        world.scene_add_entity(scene, e);
        world.scene_remove_entity(scene, e);
        world.scene_remove_entity(scene, e);

        assert_eq!(world.entity(e).unwrap().scene(), None);
        assert!(world.entity(scene).unwrap().scene_members().unwrap().is_empty());
    }

    #[test]
    fn test_dispose_scene_disposes_members() {
        let mut world = world();
        let scene = world.spawn_scene();
        let members: Vec<_> = (0..3).map(|_| world.spawn()).collect();
        for &m in &members {
            world.scene_add_entity(scene, m);
        }
        let outsider = world.spawn();

        world.dispose(scene);
        for m in members {
            assert!(!world.contains(m));
        }
        assert!(world.contains(outsider));
    }

    #[test]
    fn test_dispose_member_leaves_scene() {
        let mut world = world();
        let scene = world.spawn_scene();
        let e = world.spawn();
        world.scene_add_entity(scene, e);
        world.dispose(e);
        assert!(world.entity(scene).unwrap().scene_members().unwrap().is_empty());
    }
}
