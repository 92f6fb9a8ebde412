//! Per-entity component storage.
//!
//! Each entity owns one [`ComponentMap`]: at most one [`ComponentSlot`] per
//! component type. A slot remembers the entity it was attached to and whether
//! its destroy fan-out has completed. Once removed from the map, a slot can be
//! turned back into a typed [`Detached`] value.

use std::any::Any;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::component::{Component, ComponentTypeId};
use crate::entity::EntityId;

/// A type-erased component instance bound to its owning entity.
pub struct ComponentSlot {
    owner: EntityId,
    type_id: ComponentTypeId,
    type_name: &'static str,
    disposed: bool,
    value: Box<dyn Any>,
}

impl ComponentSlot {
    /// Wrap a component value, binding it to `owner`.
    #[must_use]
    pub fn new<C: Component>(owner: EntityId, value: C) -> Self {
        Self {
            owner,
            type_id: ComponentTypeId::of::<C>(),
            type_name: C::type_name(),
            disposed: false,
            value: Box::new(value),
        }
    }

    /// The entity this component was attached to. Never changes.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// The component's type id.
    #[must_use]
    pub fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// The component's human-readable type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` once the destroy fan-out for this instance completed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Set the disposed flag. Monotonic: there is no way to clear it.
    pub fn mark_disposed(&mut self) {
        self.disposed = true;
    }

    /// Borrow the value as `C`, if the slot holds a `C`.
    #[must_use]
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.value.downcast_ref::<C>()
    }

    /// Mutably borrow the value as `C`, if the slot holds a `C`.
    #[must_use]
    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.value.downcast_mut::<C>()
    }

    /// Mutably borrow the erased value.
    pub fn value_mut(&mut self) -> &mut dyn Any {
        self.value.as_mut()
    }

    /// Convert into a typed [`Detached`] value.
    ///
    /// # Errors
    ///
    /// Returns the slot unchanged if it does not hold a `C`.
    pub fn into_detached<C: Component>(self) -> Result<Detached<C>, Self> {
        if !self.value.is::<C>() {
            return Err(self);
        }
        let Self {
            owner,
            disposed,
            value,
            ..
        } = self;
        match value.downcast::<C>() {
            Ok(value) => Ok(Detached {
                owner,
                disposed,
                value: *value,
            }),
            // Checked with `is::<C>()` above.
            Err(_) => unreachable!("component slot type changed during detach"),
        }
    }
}

impl std::fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("owner", &self.owner)
            .field("type_name", &self.type_name)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

/// A component that has been removed from its entity.
///
/// Derefs to the component value. The owner and disposed flag are kept so the
/// caller can tell where it came from and whether its destroy fan-out ran.
#[derive(Debug)]
pub struct Detached<C> {
    owner: EntityId,
    disposed: bool,
    value: C,
}

impl<C> Detached<C> {
    /// The entity the component was attached to.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Whether the destroy fan-out completed for this instance.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Unwrap the component value.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.value
    }
}

impl<C> Deref for Detached<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.value
    }
}

impl<C> DerefMut for Detached<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.value
    }
}

/// Type-keyed component map: at most one slot per component type.
#[derive(Debug, Default)]
pub struct ComponentMap {
    slots: HashMap<ComponentTypeId, ComponentSlot>,
}

impl ComponentMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Returns `true` if a component of the given type is present.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.slots.contains_key(&type_id)
    }

    /// Returns `true` if a `C` is present.
    #[must_use]
    pub fn has<C: Component>(&self) -> bool {
        self.contains(ComponentTypeId::of::<C>())
    }

    /// Borrow the `C` component, if present.
    #[must_use]
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.slots
            .get(&ComponentTypeId::of::<C>())
            .and_then(ComponentSlot::downcast_ref::<C>)
    }

    /// Mutably borrow the `C` component, if present.
    #[must_use]
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.slots
            .get_mut(&ComponentTypeId::of::<C>())
            .and_then(ComponentSlot::downcast_mut::<C>)
    }

    /// Insert a slot, returning it back if its type is already occupied.
    ///
    /// # Errors
    ///
    /// Returns the rejected slot when a component of the same type exists;
    /// the map is left unchanged.
    pub fn insert(&mut self, slot: ComponentSlot) -> Result<(), ComponentSlot> {
        if self.slots.contains_key(&slot.type_id()) {
            return Err(slot);
        }
        self.slots.insert(slot.type_id(), slot);
        Ok(())
    }

    /// Remove and return the slot for the given type.
    pub fn remove(&mut self, type_id: ComponentTypeId) -> Option<ComponentSlot> {
        self.slots.remove(&type_id)
    }

    /// Append the type ids of every stored component to `out`.
    pub fn type_ids_into(&self, out: &mut Vec<ComponentTypeId>) {
        out.extend(self.slots.keys().copied());
    }

    /// Number of stored components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no component is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
