//! Demo simulation run by the binary.
//!
//! A scene of creatures with health, position and velocity. Health
//! regenerates every frame, movement integrates on the fixed step, and a
//! late-update pass marks creatures at zero health as dead. Damage arrives
//! as a message; a `QueryHealth` RPC reports a creature's health.

use engine_component::{Component, EntityId, QueryDescriptor};
use engine_ecs::{
    AwakeSystem, DestroySystem, Entity, EntityKind, MessageHandler, Phase, RpcHandler,
    RpcResponse, SystemRegistry, TickSystem, World,
};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use glam::Vec2;
use tracing::{debug, info};

/// Health points regenerated per second.
pub const REGEN_PER_SECOND: f32 = 2.0;

/// Kind of the entities spawned by [`populate`].
pub struct Creature;
impl EntityKind for Creature {}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}
impl Component for Health {}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub Vec2);
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub Vec2);
impl Component for Velocity {}

/// Marks a creature whose health reached zero.
#[derive(Debug, Clone, Copy)]
pub struct Dead;
impl Component for Dead {}

/// Message: subtract the wrapped amount of health.
#[derive(Debug, Clone, Copy)]
pub struct Damage(pub f32);

/// Request for a creature's health.
#[derive(Debug, Clone, Copy)]
pub struct QueryHealth;

/// Reply to [`QueryHealth`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthReport {
    pub current: f32,
    pub max: f32,
    pub error: bool,
}

impl RpcResponse for HealthReport {
    fn set_error(&mut self) {
        self.error = true;
    }

    fn is_error(&self) -> bool {
        self.error
    }
}

/// Health added with a max: start full.
struct HealthAwake;
impl AwakeSystem for HealthAwake {
    type Component = Health;
    type Args = f32;

    fn awake(&self, world: &mut World, entity: EntityId, max: &f32) {
        if let Some(health) = world.get_component_mut::<Health>(entity) {
            health.max = *max;
            health.current = *max;
        }
    }
}

struct HealthDestroy;
impl DestroySystem for HealthDestroy {
    type Component = Health;
    type Args = ();

    fn destroy(&self, _: &mut World, entity: EntityId, health: &mut Health, _: &()) {
        debug!(entity = %entity, current = health.current, "health removed");
    }
}

struct DeadAwake;
impl AwakeSystem for DeadAwake {
    type Component = Dead;
    type Args = ();

    fn awake(&self, _: &mut World, entity: EntityId, _: &()) {
        info!(entity = %entity, "creature died");
    }
}

struct Regen {
    query: QueryDescriptor,
}

impl Default for Regen {
    fn default() -> Self {
        Self {
            query: QueryDescriptor::new().with::<Health>().without::<Dead>(),
        }
    }
}

impl TickSystem for Regen {
    fn observes(&self, entity: &Entity) -> bool {
        self.query.matches(entity.components())
    }

    fn tick(&self, world: &mut World, entity: EntityId, dt: f32) {
        if let Some(health) = world.get_component_mut::<Health>(entity) {
            health.current = (health.current + REGEN_PER_SECOND * dt).min(health.max);
        }
    }
}

struct Movement {
    query: QueryDescriptor,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            query: QueryDescriptor::new()
                .with::<Position>()
                .with::<Velocity>()
                .without::<Dead>(),
        }
    }
}

impl TickSystem for Movement {
    fn observes(&self, entity: &Entity) -> bool {
        self.query.matches(entity.components())
    }

    fn tick(&self, world: &mut World, entity: EntityId, dt: f32) {
        let Some(velocity) = world.get_component::<Velocity>(entity).copied() else {
            return;
        };
        if let Some(position) = world.get_component_mut::<Position>(entity) {
            position.0 += velocity.0 * dt;
        }
    }
}

/// Same interest as [`Regen`]; marks creatures at zero health dead, which
/// drops them from both.
struct Reaper;

impl TickSystem for Reaper {
    fn observes(&self, entity: &Entity) -> bool {
        entity.has_component::<Health>() && !entity.has_component::<Dead>()
    }

    fn tick(&self, world: &mut World, entity: EntityId, _: f32) {
        if world
            .get_component::<Health>(entity)
            .is_some_and(|h| h.current <= 0.0)
        {
            world.add_component(entity, Dead);
        }
    }
}

struct ApplyDamage;
impl MessageHandler for ApplyDamage {
    type Message = Damage;

    fn post<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        damage: &'a Damage,
    ) -> LocalBoxFuture<'a, ()> {
        async move {
            if let Some(health) = world.get_component_mut::<Health>(entity) {
                health.current = (health.current - damage.0).max(0.0);
                debug!(entity = %entity, damage = damage.0, left = health.current, "damage applied");
            }
        }
        .boxed_local()
    }
}

struct AnswerHealth;
impl RpcHandler for AnswerHealth {
    type Request = QueryHealth;
    type Response = HealthReport;

    fn call<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        _: QueryHealth,
    ) -> LocalBoxFuture<'a, HealthReport> {
        async move {
            match world.get_component::<Health>(entity) {
                Some(h) => HealthReport {
                    current: h.current,
                    max: h.max,
                    error: false,
                },
                None => HealthReport::error(),
            }
        }
        .boxed_local()
    }
}

/// Register every demo system.
#[must_use]
pub fn registry() -> SystemRegistry {
    let mut registry = SystemRegistry::new();
    registry
        .register_awake(HealthAwake)
        .register_awake(DeadAwake)
        .register_destroy(HealthDestroy)
        .register_tick(Phase::Update, Regen::default())
        .register_tick(Phase::LateUpdate, Reaper)
        .register_tick(Phase::FixedUpdate, Movement::default())
        .register_message_handler(ApplyDamage)
        .register_rpc_handler(AnswerHealth);
    registry
}

/// Spawn a scene holding `count` creatures and return the scene id.
///
/// Creature `i` gets `10 * (i + 1)` max health and moves along a fixed
/// direction. Every fourth creature is attached as a child of the previous
/// one, so disposing a parent takes its child along.
pub fn populate(world: &mut World, count: usize) -> EntityId {
    let scene = world.spawn_scene();
    let mut previous = None;
    for i in 0..count {
        let creature = world.spawn_kind::<Creature>();
        world.scene_add_entity(scene, creature);
        world.add_component_with(creature, Health::default(), 10.0 * (i as f32 + 1.0));
        world.add_component(creature, Position(Vec2::ZERO));
        let angle = i as f32 * std::f32::consts::TAU / count.max(1) as f32;
        world.add_component(creature, Velocity(Vec2::from_angle(angle)));
        if i % 4 == 3
            && let Some(parent) = previous
        {
            world.add_child(parent, creature);
        }
        previous = Some(creature);
    }
    info!(scene = %scene, creatures = count, "demo scene populated");
    scene
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    fn world_with(count: usize) -> (World, EntityId) {
        let mut world = World::new(registry());
        let scene = populate(&mut world, count);
        (world, scene)
    }

    fn creatures(world: &World, scene: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        world.find_entities::<Creature>(scene, &mut out);
        out
    }

    #[test]
    fn test_registry_has_no_rejections() {
        let registry = registry();
        assert!(registry.rejections().is_empty());
        assert_eq!(registry.tick_system_count(Phase::Update), 1);
        assert_eq!(registry.tick_system_count(Phase::LateUpdate), 1);
        assert_eq!(registry.tick_system_count(Phase::FixedUpdate), 1);
    }

    #[test]
    fn test_populate_starts_full() {
        let (world, scene) = world_with(4);
        let ids = creatures(&world, scene);
        assert_eq!(ids.len(), 4);
        let health = world.get_component::<Health>(ids[1]).unwrap();
        assert_eq!(*health, Health { current: 20.0, max: 20.0 });
        assert_eq!(world.entity(ids[3]).unwrap().parent(), Some(ids[2]));
    }

    #[test]
    fn test_damage_then_regen_caps_at_max() {
        let (mut world, scene) = world_with(1);
        let e = creatures(&world, scene)[0];

        block_on(world.send_message(e, Damage(3.0)));
        assert_eq!(world.get_component::<Health>(e).unwrap().current, 7.0);

        world.update(1.0);
        assert_eq!(world.get_component::<Health>(e).unwrap().current, 9.0);
        world.update(1.0);
        assert_eq!(world.get_component::<Health>(e).unwrap().current, 10.0);
    }

    #[test]
    fn test_lethal_damage_marks_dead() {
        let (mut world, scene) = world_with(1);
        let e = creatures(&world, scene)[0];

        world.post_message(e, Damage(50.0));
        block_on(world.drain_messages());
        world.late_update(0.1);

        assert!(world.has_component::<Dead>(e));
        assert!(world.interest_of::<Regen>(Phase::Update).unwrap().is_empty());
        assert!(world.interest_of::<Movement>(Phase::FixedUpdate).unwrap().is_empty());
    }

    #[test]
    fn test_movement_on_fixed_step() {
        let (mut world, scene) = world_with(1);
        let e = creatures(&world, scene)[0];
        world.fixed_update(0.5);
        world.fixed_update(0.5);
        let position = world.get_component::<Position>(e).unwrap().0;
        assert!((position - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_health_rpc() {
        let (mut world, scene) = world_with(2);
        let e = creatures(&world, scene)[1];

        let report: HealthReport = block_on(world.send_rpc(e, QueryHealth));
        assert_eq!(report, HealthReport { current: 20.0, max: 20.0, error: false });

        let missing: HealthReport = block_on(world.send_rpc(EntityId(9_999), QueryHealth));
        assert!(missing.is_error());

        let bare: HealthReport = block_on(world.send_rpc(scene, QueryHealth));
        assert!(bare.is_error(), "scene has no health");
    }

    #[test]
    fn test_dispose_scene_clears_world() {
        let (mut world, scene) = world_with(8);
        world.dispose(scene);
        assert_eq!(world.entity_count(), 0);
    }
}
