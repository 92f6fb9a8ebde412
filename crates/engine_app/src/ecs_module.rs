//! The module that owns the [`World`].

use engine_ecs::{SystemRegistry, World};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tracing::{info, warn};

use crate::module::GameModule;

type RegistryFactory = Box<dyn FnOnce() -> SystemRegistry>;

/// Builds the world on init, runs the dispatcher each frame and disposes
/// everything on stop.
pub struct EcsModule {
    factory: Option<RegistryFactory>,
    world: Option<World>,
}

impl EcsModule {
    /// `factory` is called once, on init, to register every system.
    #[must_use]
    pub fn new(factory: impl FnOnce() -> SystemRegistry + 'static) -> Self {
        Self {
            factory: Some(Box::new(factory)),
            world: None,
        }
    }

    /// The world, once initialised.
    #[must_use]
    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// The world, once initialised.
    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.world.as_mut()
    }
}

impl GameModule for EcsModule {
    fn on_init(&mut self) {
        let Some(factory) = self.factory.take() else {
            warn!("ecs module initialised twice");
            return;
        };
        let registry = factory();
        for rejected in registry.rejections() {
            warn!(%rejected, "registration skipped");
        }
        self.world = Some(World::new(registry));
        info!("ecs world ready");
    }

    fn on_flush(&mut self) -> LocalBoxFuture<'_, ()> {
        match self.world.as_mut() {
            Some(world) => async move {
                world.drain_messages().await;
            }
            .boxed_local(),
            None => future::ready(()).boxed_local(),
        }
    }

    fn on_update(&mut self, dt: f32) {
        if let Some(world) = self.world.as_mut() {
            world.update(dt);
        }
    }

    fn on_late_update(&mut self, dt: f32) {
        if let Some(world) = self.world.as_mut() {
            world.late_update(dt);
        }
    }

    fn on_fixed_update(&mut self, dt: f32) {
        if let Some(world) = self.world.as_mut() {
            world.fixed_update(dt);
        }
    }

    fn on_stop(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{Component, EntityId};
    use engine_ecs::{Entity, Phase, TickSystem};

    use super::*;
    use crate::module::ModuleHost;

    struct Counter(u32);
    impl Component for Counter {}

    struct Count;
    impl TickSystem for Count {
        fn observes(&self, entity: &Entity) -> bool {
            entity.has_component::<Counter>()
        }
        fn tick(&self, world: &mut World, entity: EntityId, _: f32) {
            if let Some(c) = world.get_component_mut::<Counter>(entity) {
                c.0 += 1;
            }
        }
    }

    fn registry() -> SystemRegistry {
        let mut registry = SystemRegistry::new();
        registry.register_tick(Phase::Update, Count);
        registry
    }

    #[test]
    fn test_world_built_on_init() {
        let mut module = EcsModule::new(registry);
        assert!(module.world().is_none());
        module.on_init();
        assert_eq!(module.world().unwrap().registry().tick_system_count(Phase::Update), 1);
    }

    #[test]
    fn test_host_drives_world() {
        let mut host = ModuleHost::new();
        host.add_module(EcsModule::new(registry));
        host.init_modules();

        let world = host.module_mut::<EcsModule>().unwrap().world_mut().unwrap();
        let e = world.spawn();
        world.add_component(e, Counter(0));

        host.update(0.1);
        host.update(0.1);
        let world = host.module::<EcsModule>().unwrap().world().unwrap();
        assert_eq!(world.get_component::<Counter>(e).unwrap().0, 2);

        host.shutdown();
        let world = host.module::<EcsModule>().unwrap().world().unwrap();
        assert_eq!(world.entity_count(), 0);
    }
}
