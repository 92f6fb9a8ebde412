//! # engine_ecs
//!
//! Entity lifecycle and system scheduling on top of `engine_component`.
//!
//! - [`World`] owns the entity directory. Entities form a parent/child tree;
//!   scene entities additionally keep a flat member registry. Disposal
//!   cascades through both.
//! - [`SystemRegistry`] is built once at start-up from explicit
//!   registrations of awake, destroy and tick systems plus message and RPC
//!   handlers.
//! - Each tick system keeps an interest set that is updated incrementally on
//!   every entity mutation, so [`World::update`], [`World::late_update`] and
//!   [`World::fixed_update`] only visit entities the system cares about.
//! - [`World::send_message`] and [`World::send_rpc`] address asynchronous
//!   handlers; [`World::post_message`] queues for [`World::drain_messages`].
//!
//! Everything here is single-threaded.

pub mod dispatch;
pub mod entity;
pub mod error;
pub mod interest;
pub mod message;
pub mod pool;
pub mod registry;
pub mod scene;
pub mod system;
pub mod world;

pub use entity::{AnyKind, Entity, EntityKind, EntityKindId, Plain, Scene};
pub use error::RegistryError;
pub use pool::{ObjectPool, Pooled, Reset};
pub use registry::SystemRegistry;
pub use system::{
    AwakeSystem, DestroySystem, MessageHandler, Phase, RpcHandler, RpcResponse, TickSystem,
};
pub use world::World;
