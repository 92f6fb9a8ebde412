//! Declarative component-presence queries.
//!
//! A [`QueryDescriptor`] lists the component types an entity must have and
//! must not have. Tick systems typically build one at construction time and
//! answer their "observes this entity" predicate with
//! [`QueryDescriptor::matches`], which keeps the predicate a pure function of
//! component presence.

use crate::component::{Component, ComponentTypeId};
use crate::store::ComponentMap;

/// A filter that narrows the set of entities matched by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFilter {
    /// Only match entities that have this component.
    With(ComponentTypeId),
    /// Only match entities that do NOT have this component.
    Without(ComponentTypeId),
}

impl QueryFilter {
    /// Evaluate this filter against a component map.
    #[must_use]
    pub fn matches(&self, components: &ComponentMap) -> bool {
        match *self {
            QueryFilter::With(ty) => components.contains(ty),
            QueryFilter::Without(ty) => !components.contains(ty),
        }
    }
}

/// A conjunction of [`QueryFilter`]s.
///
/// An empty descriptor matches every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDescriptor {
    filters: Vec<QueryFilter>,
}

impl QueryDescriptor {
    /// Create a new empty query descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Require component `C`.
    #[must_use]
    pub fn with<C: Component>(self) -> Self {
        self.filter(QueryFilter::With(ComponentTypeId::of::<C>()))
    }

    /// Exclude entities carrying component `C`.
    #[must_use]
    pub fn without<C: Component>(self) -> Self {
        self.filter(QueryFilter::Without(ComponentTypeId::of::<C>()))
    }

    /// Add a raw query filter.
    #[must_use]
    pub fn filter(mut self, f: QueryFilter) -> Self {
        self.filters.push(f);
        self
    }

    /// The filters, in insertion order.
    #[must_use]
    pub fn filters(&self) -> &[QueryFilter] {
        &self.filters
    }

    /// Returns the component types this query requires.
    #[must_use]
    pub fn required_types(&self) -> Vec<ComponentTypeId> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                QueryFilter::With(ty) => Some(*ty),
                QueryFilter::Without(_) => None,
            })
            .collect()
    }

    /// Returns `true` when every filter holds for `components`.
    #[must_use]
    pub fn matches(&self, components: &ComponentMap) -> bool {
        self.filters.iter().all(|f| f.matches(components))
    }
}
