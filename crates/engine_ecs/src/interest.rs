//! Interest tracking for tick systems.
//!
//! Every tick system has one interest set. The sets are a cache of
//! `system.observes(entity)`, maintained incrementally: whenever an entity is
//! mutated through the [`World`], [`World::refresh_interest`] re-evaluates
//! every tick system's predicate for that one entity and adds or removes it.
//! Nothing rebuilds the sets wholesale.

use std::collections::HashSet;

use engine_component::EntityId;

use crate::entity::Entity;
use crate::registry::SystemRegistry;
use crate::system::{Phase, TickSystem};
use crate::world::World;

/// The entities one tick system currently observes, in the order they
/// started qualifying.
#[derive(Debug, Default)]
pub(crate) struct InterestSet {
    order: Vec<EntityId>,
    members: HashSet<EntityId>,
}

impl InterestSet {
    pub(crate) fn contains(&self, entity: EntityId) -> bool {
        self.members.contains(&entity)
    }

    pub(crate) fn insert(&mut self, entity: EntityId) {
        if self.members.insert(entity) {
            self.order.push(entity);
        }
    }

    pub(crate) fn remove(&mut self, entity: EntityId) {
        if self.members.remove(&entity)
            && let Some(pos) = self.order.iter().position(|&e| e == entity)
        {
            self.order.remove(pos);
        }
    }

    pub(crate) fn as_slice(&self) -> &[EntityId] {
        &self.order
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// One [`InterestSet`] per registered tick system, parallel to the
/// registry's per-phase system lists.
#[derive(Debug)]
pub(crate) struct InterestTracker {
    sets: [Vec<InterestSet>; 3],
}

impl InterestTracker {
    pub(crate) fn new(registry: &SystemRegistry) -> Self {
        let sets = Phase::ALL.map(|phase| {
            (0..registry.tick_system_count(phase))
                .map(|_| InterestSet::default())
                .collect::<Vec<_>>()
        });
        Self { sets }
    }

    pub(crate) fn set(&self, phase: Phase, index: usize) -> &InterestSet {
        &self.sets[phase.index()][index]
    }

    /// Apply the add / remove / no-op rule for every tick system.
    pub(crate) fn refresh(&mut self, registry: &SystemRegistry, entity: &Entity) {
        for phase in Phase::ALL {
            let systems = registry.tick_systems(phase);
            for (entry, set) in systems.iter().zip(self.sets[phase.index()].iter_mut()) {
                let tracked = set.contains(entity.id());
                let observed = entry.system.observes(entity);
                match (tracked, observed) {
                    (false, true) => set.insert(entity.id()),
                    (true, false) => set.remove(entity.id()),
                    _ => {}
                }
            }
        }
    }

    /// Drop `entity` from every set.
    pub(crate) fn purge(&mut self, entity: EntityId) {
        for set in self.sets.iter_mut().flatten() {
            set.remove(entity);
        }
    }
}

impl World {
    /// Re-evaluate every tick system's predicate for `entity`.
    ///
    /// All structural mutations (component add/remove, reparenting, scene
    /// moves, spawn) call this already. Call it yourself after changing a
    /// component value that a predicate reads. Missing or disposed entities
    /// are dropped from every set.
    pub fn refresh_interest(&mut self, entity: EntityId) {
        match self.entities.get(&entity) {
            Some(node) if !node.disposed => self.interest.refresh(&self.registry, node),
            _ => self.interest.purge(entity),
        }
    }

    /// The interest set of tick system `S` in `phase`, or `None` if `S` is
    /// not registered for that phase.
    #[must_use]
    pub fn interest_of<S: TickSystem>(&self, phase: Phase) -> Option<&[EntityId]> {
        let index = self
            .registry
            .tick_index_of(phase, std::any::TypeId::of::<S>())?;
        Some(self.interest.set(phase, index).as_slice())
    }
}
