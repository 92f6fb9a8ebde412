//! Per-phase dispatch and the awake/destroy fan-out.
//!
//! A phase sweep walks the tick systems in registration order. For each one
//! it copies the interest set into a pooled scratch buffer and ticks every
//! entity that still exists and still satisfies the predicate, so systems
//! may add, remove and dispose freely while a sweep is running.

use std::any::{Any, TypeId};
use std::rc::Rc;

use engine_component::{Component, ComponentSlot, ComponentTypeId, EntityId, short_type_name};
use tracing::{trace, warn};

use crate::system::Phase;
use crate::world::World;

impl World {
    /// Run every update system over its interest set.
    pub fn update(&mut self, dt: f32) {
        self.run_phase(Phase::Update, dt);
    }

    /// Run every late-update system over its interest set.
    pub fn late_update(&mut self, dt: f32) {
        self.run_phase(Phase::LateUpdate, dt);
    }

    /// Run every fixed-update system over its interest set.
    pub fn fixed_update(&mut self, dt: f32) {
        self.run_phase(Phase::FixedUpdate, dt);
    }

    /// Run one phase.
    ///
    /// Entities that join an interest set during the sweep wait for the next
    /// one. A panicking system unwinds out of the sweep; the scratch buffer
    /// still goes back to the pool.
    pub fn run_phase(&mut self, phase: Phase, dt: f32) {
        let registry = Rc::clone(&self.registry);
        for (index, entry) in registry.tick_systems(phase).iter().enumerate() {
            let interest = self.interest.set(phase, index);
            if interest.is_empty() {
                continue;
            }
            let mut snapshot = self.id_pool.obtain();
            snapshot.extend_from_slice(interest.as_slice());
            trace!(%phase, system = entry.name, entities = snapshot.len(), "tick sweep");

            for &entity in snapshot.iter() {
                let observed = self
                    .entities
                    .get(&entity)
                    .is_some_and(|e| !e.disposed && entry.system.observes(e));
                if observed {
                    entry.system.tick(self, entity, dt);
                }
            }
        }
    }

    pub(crate) fn awake_component<C: Component, A: 'static>(&mut self, entity: EntityId, args: &A) {
        let registry = Rc::clone(&self.registry);
        let args_type = TypeId::of::<A>();
        let mut invoked = 0_usize;
        for system in registry.awake_systems(ComponentTypeId::of::<C>()) {
            if system.args_type() != args_type {
                continue;
            }
            trace!(entity = %entity, system = system.system_name(), "awake");
            system.awake_erased(self, entity, args);
            invoked += 1;
        }
        if invoked == 0 {
            warn!(
                entity = %entity,
                component = C::type_name(),
                args = short_type_name::<A>(),
                "no awake system for component"
            );
        }
    }

    /// Run the destroy systems whose args type matches `args_type` for a slot
    /// that has already left its entity, then flag it disposed.
    pub(crate) fn destroy_component(
        &mut self,
        entity: EntityId,
        slot: ComponentSlot,
        args: &dyn Any,
        args_type: TypeId,
    ) -> ComponentSlot {
        self.destroy_fan_out(entity, slot, Some((args, args_type)))
    }

    /// Run every destroy system for the slot's type, as entity disposal does.
    /// Parameterized systems get their default args.
    pub(crate) fn dispose_component(&mut self, entity: EntityId, slot: ComponentSlot) -> ComponentSlot {
        self.destroy_fan_out(entity, slot, None)
    }

    fn destroy_fan_out(
        &mut self,
        entity: EntityId,
        mut slot: ComponentSlot,
        args: Option<(&dyn Any, TypeId)>,
    ) -> ComponentSlot {
        self.refresh_interest(entity);
        let registry = Rc::clone(&self.registry);
        let mut invoked = 0_usize;
        for system in registry.destroy_systems(slot.type_id()) {
            match args {
                Some((args, args_type)) if system.args_type() == args_type => {
                    trace!(entity = %entity, system = system.system_name(), "destroy");
                    system.destroy_erased(self, entity, slot.value_mut(), args);
                }
                Some(_) => continue,
                None => {
                    trace!(entity = %entity, system = system.system_name(), "destroy on dispose");
                    system.destroy_default(self, entity, slot.value_mut());
                }
            }
            invoked += 1;
        }
        if invoked == 0 {
            trace!(entity = %entity, component = slot.type_name(), "no destroy system for component");
        }
        slot.mark_disposed();
        slot
    }
}
