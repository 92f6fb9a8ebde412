//! Core [`Component`] trait and its type identity.
//!
//! Components are plain data attached to exactly one entity. The core never
//! inspects component contents: it only needs a stable per-type key to store
//! at most one instance of each type per entity, and a readable name for
//! logging.

use std::any::{Any, TypeId};

/// A unique identifier for a component type.
///
/// Backed by [`TypeId`], so two distinct Rust types never share an id and the
/// id costs nothing to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(TypeId);

impl ComponentTypeId {
    /// Returns the [`ComponentTypeId`] for a component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self(TypeId::of::<T>())
    }

    /// Wraps a raw [`TypeId`].
    ///
    /// Used by type-erased code that already holds the id of a `dyn Any`.
    #[must_use]
    pub const fn from_type_id(type_id: TypeId) -> Self {
        Self(type_id)
    }

    /// Returns the underlying [`TypeId`].
    #[must_use]
    pub const fn type_id(self) -> TypeId {
        self.0
    }
}

/// The core component trait.
///
/// Any `'static` type can be a component. Implementations usually only need
/// the empty `impl`; [`Component::type_name`] can be overridden to give logs
/// a friendlier name.
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, ComponentTypeId};
///
/// #[derive(Debug, Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
///
/// assert_eq!(Health::type_name(), "Health");
/// assert_eq!(Health::component_type_id(), ComponentTypeId::of::<Health>());
/// ```
pub trait Component: Any {
    /// A human-readable name for this component type.
    ///
    /// Defaults to the last path segment of [`std::any::type_name`].
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId
    where
        Self: Sized,
    {
        ComponentTypeId::of::<Self>()
    }
}

/// Returns the last `::` segment of `T`'s type name, keeping generic
/// arguments intact (`Wrapper<Foo>` rather than `Foo>`).
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {}

    #[derive(Debug)]
    struct Velocity;

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Vel"
        }
    }

    #[test]
    fn test_component_type_id_is_stable() {
        assert_eq!(Health::component_type_id(), Health::component_type_id());
    }

    #[test]
    fn test_component_type_id_matches_of() {
        assert_eq!(Health::component_type_id(), ComponentTypeId::of::<Health>());
    }

    #[test]
    fn test_component_type_id_differs_between_types() {
        assert_ne!(Health::component_type_id(), Velocity::component_type_id());
    }

    #[test]
    fn test_from_type_id_roundtrip() {
        let id = ComponentTypeId::from_type_id(TypeId::of::<Health>());
        assert_eq!(id, ComponentTypeId::of::<Health>());
        assert_eq!(id.type_id(), TypeId::of::<Health>());
    }

    #[test]
    fn test_default_type_name_is_short() {
        assert_eq!(Health::type_name(), "Health");
    }

    #[test]
    fn test_type_name_override() {
        assert_eq!(Velocity::type_name(), "Vel");
    }

    #[test]
    fn test_short_type_name_keeps_generics() {
        assert_eq!(short_type_name::<Option<Health>>(), "Option<engine_component::component::tests::Health>");
    }
}
