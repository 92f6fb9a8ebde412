//! # engine_component
//!
//! The "C" in ECS: component identity and per-entity storage.
//!
//! This crate provides:
//!
//! - [`Component`] trait, the contract all component data satisfies.
//! - [`EntityId`]: arena handles for entities.
//! - [`ComponentMap`]: per-entity, type-keyed component storage.
//! - [`QueryDescriptor`]: declarative component-presence predicates.

pub mod component;
pub mod entity;
pub mod query;
pub mod store;

pub use component::{Component, ComponentTypeId, short_type_name};
pub use entity::EntityId;
pub use query::{QueryDescriptor, QueryFilter};
pub use store::{ComponentMap, ComponentSlot, Detached};
