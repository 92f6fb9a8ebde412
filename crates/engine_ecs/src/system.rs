//! System and handler traits.
//!
//! Systems are stateless logic units. Each kind of system is one trait:
//!
//! - [`AwakeSystem`] / [`DestroySystem`]: called synchronously when a
//!   component of their type is added to / removed from an entity.
//! - [`TickSystem`]: called once per frame for every entity it observes,
//!   in the [`Phase`] it was registered for.
//! - [`MessageHandler`] / [`RpcHandler`]: asynchronous handlers for payloads
//!   addressed to an entity.
//!
//! The registry stores them behind the crate-private erased traits at the
//! bottom of this module, which downcast arguments back to the concrete
//! types.

use std::any::{Any, TypeId};
use std::fmt;

use engine_component::{Component, EntityId, short_type_name};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};

use crate::entity::Entity;
use crate::world::World;

/// A per-frame dispatch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Regular per-frame update.
    Update,
    /// Runs after every update system has finished for the frame.
    LateUpdate,
    /// Fixed-timestep update, zero or more times per frame.
    FixedUpdate,
}

impl Phase {
    /// Every phase, in per-frame order.
    pub const ALL: [Phase; 3] = [Phase::Update, Phase::LateUpdate, Phase::FixedUpdate];

    pub(crate) const fn index(self) -> usize {
        match self {
            Phase::Update => 0,
            Phase::LateUpdate => 1,
            Phase::FixedUpdate => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Update => "update",
            Phase::LateUpdate => "late update",
            Phase::FixedUpdate => "fixed update",
        })
    }
}

/// Reacts to a component being added.
///
/// `Args` is the extra payload the add call carries: `()` for a plain add,
/// a single value, or a tuple of two. Only systems whose `Args` matches the
/// add call exactly are invoked.
pub trait AwakeSystem: 'static {
    /// The component type this system reacts to.
    type Component: Component;
    /// The extra arguments this system expects.
    type Args: 'static;

    /// Called after the component has been stored on `entity`.
    fn awake(&self, world: &mut World, entity: EntityId, args: &Self::Args);
}

/// Reacts to a component being removed.
///
/// The component has already left the entity's map when this runs; it is
/// passed in directly.
///
/// An explicit remove only reaches systems whose `Args` matches the remove
/// call. Disposing the entity reaches every destroy system for the
/// component type, handing parameterized ones `Args::default()`.
pub trait DestroySystem: 'static {
    /// The component type this system reacts to.
    type Component: Component;
    /// The extra arguments this system expects.
    type Args: Default + 'static;

    /// Called with the removed component.
    fn destroy(
        &self,
        world: &mut World,
        entity: EntityId,
        component: &mut Self::Component,
        args: &Self::Args,
    );
}

/// A per-frame system for one [`Phase`].
pub trait TickSystem: 'static {
    /// Returns `true` if this system should process `entity`.
    ///
    /// Re-evaluated on every component mutation of `entity` and again right
    /// before each call to [`TickSystem::tick`].
    fn observes(&self, entity: &Entity) -> bool;

    /// Process one observed entity.
    fn tick(&self, world: &mut World, entity: EntityId, dt: f32);
}

/// Handles messages of one payload type addressed to an entity.
///
/// Any number of handlers may exist per payload type; they run in
/// registration order, each awaited to completion before the next.
pub trait MessageHandler: 'static {
    /// The payload type.
    type Message: 'static;

    /// Handle `message` for `entity`.
    fn post<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        message: &'a Self::Message,
    ) -> LocalBoxFuture<'a, ()>;
}

/// A response type that can carry an error flag.
pub trait RpcResponse: Default + 'static {
    /// Flag this response as an error.
    fn set_error(&mut self);

    /// Returns `true` if this response is flagged as an error.
    fn is_error(&self) -> bool;

    /// A default response flagged as an error.
    #[must_use]
    fn error() -> Self {
        let mut response = Self::default();
        response.set_error();
        response
    }
}

/// Handles one request type addressed to an entity. At most one handler may
/// be registered per request type.
pub trait RpcHandler: 'static {
    /// The request type.
    type Request: 'static;
    /// The response type.
    type Response: RpcResponse;

    /// Handle `request` for `entity`.
    fn call<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        request: Self::Request,
    ) -> LocalBoxFuture<'a, Self::Response>;
}

pub(crate) trait ErasedAwake {
    fn system_name(&self) -> &'static str;
    fn args_type(&self) -> TypeId;
    fn awake_erased(&self, world: &mut World, entity: EntityId, args: &dyn Any);
}

impl<S: AwakeSystem> ErasedAwake for S {
    fn system_name(&self) -> &'static str {
        short_type_name::<S>()
    }

    fn args_type(&self) -> TypeId {
        TypeId::of::<S::Args>()
    }

    fn awake_erased(&self, world: &mut World, entity: EntityId, args: &dyn Any) {
        if let Some(args) = args.downcast_ref::<S::Args>() {
            self.awake(world, entity, args);
        }
    }
}

pub(crate) trait ErasedDestroy {
    fn system_name(&self) -> &'static str;
    fn args_type(&self) -> TypeId;
    fn destroy_erased(
        &self,
        world: &mut World,
        entity: EntityId,
        component: &mut dyn Any,
        args: &dyn Any,
    );
    fn destroy_default(&self, world: &mut World, entity: EntityId, component: &mut dyn Any);
}

impl<S: DestroySystem> ErasedDestroy for S {
    fn system_name(&self) -> &'static str {
        short_type_name::<S>()
    }

    fn args_type(&self) -> TypeId {
        TypeId::of::<S::Args>()
    }

    fn destroy_erased(
        &self,
        world: &mut World,
        entity: EntityId,
        component: &mut dyn Any,
        args: &dyn Any,
    ) {
        if let (Some(component), Some(args)) = (
            component.downcast_mut::<S::Component>(),
            args.downcast_ref::<S::Args>(),
        ) {
            self.destroy(world, entity, component, args);
        }
    }

    fn destroy_default(&self, world: &mut World, entity: EntityId, component: &mut dyn Any) {
        if let Some(component) = component.downcast_mut::<S::Component>() {
            self.destroy(world, entity, component, &S::Args::default());
        }
    }
}

pub(crate) trait ErasedMessageHandler {
    fn handler_name(&self) -> &'static str;
    fn post_erased<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        message: &'a dyn Any,
    ) -> LocalBoxFuture<'a, ()>;
}

impl<H: MessageHandler> ErasedMessageHandler for H {
    fn handler_name(&self) -> &'static str {
        short_type_name::<H>()
    }

    fn post_erased<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        message: &'a dyn Any,
    ) -> LocalBoxFuture<'a, ()> {
        match message.downcast_ref::<H::Message>() {
            Some(message) => self.post(world, entity, message),
            None => future::ready(()).boxed_local(),
        }
    }
}

pub(crate) trait ErasedRpcHandler {
    fn handler_name(&self) -> &'static str;
    fn response_type(&self) -> TypeId;
    fn call_erased<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        request: Box<dyn Any>,
    ) -> LocalBoxFuture<'a, Box<dyn Any>>;
}

impl<H: RpcHandler> ErasedRpcHandler for H {
    fn handler_name(&self) -> &'static str {
        short_type_name::<H>()
    }

    fn response_type(&self) -> TypeId {
        TypeId::of::<H::Response>()
    }

    fn call_erased<'a>(
        &'a self,
        world: &'a mut World,
        entity: EntityId,
        request: Box<dyn Any>,
    ) -> LocalBoxFuture<'a, Box<dyn Any>> {
        match request.downcast::<H::Request>() {
            Ok(request) => {
                let response = self.call(world, entity, *request);
                async move { Box::new(response.await) as Box<dyn Any> }.boxed_local()
            }
            Err(_) => future::ready(Box::new(H::Response::error()) as Box<dyn Any>).boxed_local(),
        }
    }
}
