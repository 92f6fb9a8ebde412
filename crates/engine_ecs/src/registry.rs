//! System registry: the start-up table of every system and handler.
//!
//! Systems are registered explicitly, once, before the [`World`] is built:
//!
//! ```rust
//! use engine_ecs::{Phase, SystemRegistry, TickSystem, World, Entity};
//! use engine_component::EntityId;
//!
//! struct Spin;
//! impl TickSystem for Spin {
//!     fn observes(&self, _entity: &Entity) -> bool { true }
//!     fn tick(&self, _world: &mut World, _entity: EntityId, _dt: f32) {}
//! }
//!
//! let mut registry = SystemRegistry::new();
//! registry.register_tick(Phase::Update, Spin);
//! let world = World::new(registry);
//! assert_eq!(world.registry().tick_system_count(Phase::Update), 1);
//! ```
//!
//! A concrete system type may appear at most once per phase (awake, destroy,
//! update, late update, fixed update) and a request type may have at most one
//! RPC handler. Duplicates are skipped with an error log and recorded in
//! [`SystemRegistry::rejections`]. Message handlers accumulate per payload
//! type without duplicate checks.
//!
//! [`World`]: crate::World

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use engine_component::{ComponentTypeId, short_type_name};
use tracing::{debug, error};

use crate::error::RegistryError;
use crate::system::{
    AwakeSystem, DestroySystem, ErasedAwake, ErasedDestroy, ErasedMessageHandler,
    ErasedRpcHandler, MessageHandler, Phase, RpcHandler, TickSystem,
};

/// A registered tick system.
pub(crate) struct TickEntry {
    pub(crate) system: Rc<dyn TickSystem>,
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
}

/// Registry of every system and handler known to a world.
#[derive(Default)]
pub struct SystemRegistry {
    /// Awake systems keyed by the component type they react to.
    awake: HashMap<ComponentTypeId, Vec<Box<dyn ErasedAwake>>>,
    awake_types: HashSet<TypeId>,
    /// Destroy systems keyed by the component type they react to.
    destroy: HashMap<ComponentTypeId, Vec<Box<dyn ErasedDestroy>>>,
    destroy_types: HashSet<TypeId>,
    /// Tick systems per phase, in registration order.
    tick: [Vec<TickEntry>; 3],
    messages: HashMap<TypeId, Vec<Box<dyn ErasedMessageHandler>>>,
    rpc: HashMap<TypeId, Box<dyn ErasedRpcHandler>>,
    rejections: Vec<RegistryError>,
}

impl SystemRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an awake system.
    pub fn register_awake<S: AwakeSystem>(&mut self, system: S) -> &mut Self {
        let name = short_type_name::<S>();
        if !self.awake_types.insert(TypeId::of::<S>()) {
            self.reject(RegistryError::DuplicateAwake(name));
            return self;
        }
        debug!(system = name, component = short_type_name::<S::Component>(), "registered awake system");
        self.awake
            .entry(ComponentTypeId::of::<S::Component>())
            .or_default()
            .push(Box::new(system));
        self
    }

    /// Register a destroy system.
    pub fn register_destroy<S: DestroySystem>(&mut self, system: S) -> &mut Self {
        let name = short_type_name::<S>();
        if !self.destroy_types.insert(TypeId::of::<S>()) {
            self.reject(RegistryError::DuplicateDestroy(name));
            return self;
        }
        debug!(system = name, component = short_type_name::<S::Component>(), "registered destroy system");
        self.destroy
            .entry(ComponentTypeId::of::<S::Component>())
            .or_default()
            .push(Box::new(system));
        self
    }

    /// Register a tick system for `phase`.
    ///
    /// The same type may be registered once per phase, so one system can
    /// serve several phases.
    pub fn register_tick<S: TickSystem>(&mut self, phase: Phase, system: S) -> &mut Self {
        let name = short_type_name::<S>();
        let entries = &mut self.tick[phase.index()];
        if entries.iter().any(|e| e.type_id == TypeId::of::<S>()) {
            self.reject(RegistryError::DuplicateTick {
                phase,
                system: name,
            });
            return self;
        }
        debug!(system = name, %phase, "registered tick system");
        entries.push(TickEntry {
            system: Rc::new(system),
            type_id: TypeId::of::<S>(),
            name,
        });
        self
    }

    /// Register a message handler. Handlers for the same payload type run in
    /// registration order.
    pub fn register_message_handler<H: MessageHandler>(&mut self, handler: H) -> &mut Self {
        debug!(
            handler = short_type_name::<H>(),
            message = short_type_name::<H::Message>(),
            "registered message handler"
        );
        self.messages
            .entry(TypeId::of::<H::Message>())
            .or_default()
            .push(Box::new(handler));
        self
    }

    /// Register the RPC handler for `H::Request`. A second handler for the
    /// same request type is rejected.
    pub fn register_rpc_handler<H: RpcHandler>(&mut self, handler: H) -> &mut Self {
        let request = TypeId::of::<H::Request>();
        if self.rpc.contains_key(&request) {
            self.reject(RegistryError::DuplicateRpc {
                request: short_type_name::<H::Request>(),
                handler: short_type_name::<H>(),
            });
            return self;
        }
        debug!(
            handler = short_type_name::<H>(),
            request = short_type_name::<H::Request>(),
            "registered rpc handler"
        );
        self.rpc.insert(request, Box::new(handler));
        self
    }

    fn reject(&mut self, err: RegistryError) {
        error!(%err, "system registration rejected");
        self.rejections.push(err);
    }

    /// Registrations rejected so far.
    #[must_use]
    pub fn rejections(&self) -> &[RegistryError] {
        &self.rejections
    }

    /// Number of tick systems registered for `phase`.
    #[must_use]
    pub fn tick_system_count(&self, phase: Phase) -> usize {
        self.tick[phase.index()].len()
    }

    /// Number of awake systems registered for component type `ty`.
    #[must_use]
    pub fn awake_system_count(&self, ty: ComponentTypeId) -> usize {
        self.awake.get(&ty).map_or(0, Vec::len)
    }

    /// Number of destroy systems registered for component type `ty`.
    #[must_use]
    pub fn destroy_system_count(&self, ty: ComponentTypeId) -> usize {
        self.destroy.get(&ty).map_or(0, Vec::len)
    }

    /// Number of message handlers registered for payload type `M`.
    #[must_use]
    pub fn message_handler_count<M: 'static>(&self) -> usize {
        self.messages.get(&TypeId::of::<M>()).map_or(0, Vec::len)
    }

    /// Returns `true` if an RPC handler exists for request type `R`.
    #[must_use]
    pub fn has_rpc_handler<R: 'static>(&self) -> bool {
        self.rpc.contains_key(&TypeId::of::<R>())
    }

    pub(crate) fn awake_systems(&self, ty: ComponentTypeId) -> &[Box<dyn ErasedAwake>] {
        self.awake.get(&ty).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn destroy_systems(&self, ty: ComponentTypeId) -> &[Box<dyn ErasedDestroy>] {
        self.destroy.get(&ty).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn tick_systems(&self, phase: Phase) -> &[TickEntry] {
        &self.tick[phase.index()]
    }

    pub(crate) fn tick_index_of(&self, phase: Phase, type_id: TypeId) -> Option<usize> {
        self.tick[phase.index()]
            .iter()
            .position(|e| e.type_id == type_id)
    }

    pub(crate) fn message_handlers(&self, message: TypeId) -> &[Box<dyn ErasedMessageHandler>] {
        self.messages.get(&message).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn rpc_handler(&self, request: TypeId) -> Option<&dyn ErasedRpcHandler> {
        self.rpc.get(&request).map(|h| h.as_ref())
    }
}

impl fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("awake", &self.awake_types.len())
            .field("destroy", &self.destroy_types.len())
            .field("update", &self.tick[0].len())
            .field("late_update", &self.tick[1].len())
            .field("fixed_update", &self.tick[2].len())
            .field("message_types", &self.messages.len())
            .field("rpc_types", &self.rpc.len())
            .field("rejections", &self.rejections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{Component, EntityId};
    use futures::FutureExt;
    use futures::future::LocalBoxFuture;

    use super::*;
    use crate::entity::Entity;
    use crate::system::RpcResponse;
    use crate::world::World;

    struct Health;
    impl Component for Health {}

    struct HealthAwake;
    impl AwakeSystem for HealthAwake {
        type Component = Health;
        type Args = ();
        fn awake(&self, _: &mut World, _: EntityId, _: &()) {}
    }

    struct HealthAwakeWithAmount;
    impl AwakeSystem for HealthAwakeWithAmount {
        type Component = Health;
        type Args = u32;
        fn awake(&self, _: &mut World, _: EntityId, _: &u32) {}
    }

    struct HealthDestroy;
    impl DestroySystem for HealthDestroy {
        type Component = Health;
        type Args = ();
        fn destroy(&self, _: &mut World, _: EntityId, _: &mut Health, _: &()) {}
    }

    struct Regen;
    impl TickSystem for Regen {
        fn observes(&self, entity: &Entity) -> bool {
            entity.has_component::<Health>()
        }
        fn tick(&self, _: &mut World, _: EntityId, _: f32) {}
    }

    struct Ping;

    struct LogPing;
    impl MessageHandler for LogPing {
        type Message = Ping;
        fn post<'a>(&'a self, _: &'a mut World, _: EntityId, _: &'a Ping) -> LocalBoxFuture<'a, ()> {
            async {}.boxed_local()
        }
    }

    struct CountPing;
    impl MessageHandler for CountPing {
        type Message = Ping;
        fn post<'a>(&'a self, _: &'a mut World, _: EntityId, _: &'a Ping) -> LocalBoxFuture<'a, ()> {
            async {}.boxed_local()
        }
    }

    struct Ask;

    #[derive(Default)]
    struct Answer {
        error: bool,
    }
    impl RpcResponse for Answer {
        fn set_error(&mut self) {
            self.error = true;
        }
        fn is_error(&self) -> bool {
            self.error
        }
    }

    struct AskHandler;
    impl RpcHandler for AskHandler {
        type Request = Ask;
        type Response = Answer;
        fn call<'a>(&'a self, _: &'a mut World, _: EntityId, _: Ask) -> LocalBoxFuture<'a, Answer> {
            async { Answer::default() }.boxed_local()
        }
    }

    struct OtherAskHandler;
    impl RpcHandler for OtherAskHandler {
        type Request = Ask;
        type Response = Answer;
        fn call<'a>(&'a self, _: &'a mut World, _: EntityId, _: Ask) -> LocalBoxFuture<'a, Answer> {
            async { Answer::error() }.boxed_local()
        }
    }

    #[test]
    fn test_register_awake_systems_by_component() {
        let mut registry = SystemRegistry::new();
        registry
            .register_awake(HealthAwake)
            .register_awake(HealthAwakeWithAmount);
        assert_eq!(registry.awake_system_count(ComponentTypeId::of::<Health>()), 2);
        assert!(registry.rejections().is_empty());
    }

    #[test]
    fn test_duplicate_awake_rejected() {
        let mut registry = SystemRegistry::new();
        registry.register_awake(HealthAwake).register_awake(HealthAwake);
        assert_eq!(registry.awake_system_count(ComponentTypeId::of::<Health>()), 1);
        assert_eq!(
            registry.rejections(),
            &[RegistryError::DuplicateAwake("HealthAwake")]
        );
    }

    #[test]
    fn test_duplicate_destroy_rejected() {
        let mut registry = SystemRegistry::new();
        registry
            .register_destroy(HealthDestroy)
            .register_destroy(HealthDestroy);
        assert_eq!(registry.destroy_system_count(ComponentTypeId::of::<Health>()), 1);
        assert_eq!(registry.rejections().len(), 1);
    }

    #[test]
    fn test_tick_duplicate_is_per_phase() {
        let mut registry = SystemRegistry::new();
        registry
            .register_tick(Phase::Update, Regen)
            .register_tick(Phase::FixedUpdate, Regen)
            .register_tick(Phase::Update, Regen);
        assert_eq!(registry.tick_system_count(Phase::Update), 1);
        assert_eq!(registry.tick_system_count(Phase::FixedUpdate), 1);
        assert_eq!(registry.tick_system_count(Phase::LateUpdate), 0);
        assert_eq!(
            registry.rejections(),
            &[RegistryError::DuplicateTick {
                phase: Phase::Update,
                system: "Regen"
            }]
        );
    }

    #[test]
    fn test_message_handlers_accumulate() {
        let mut registry = SystemRegistry::new();
        registry
            .register_message_handler(LogPing)
            .register_message_handler(CountPing)
            .register_message_handler(LogPing);
        assert_eq!(registry.message_handler_count::<Ping>(), 3);
        assert!(registry.rejections().is_empty());
    }

    #[test]
    fn test_duplicate_rpc_keeps_first() {
        let mut registry = SystemRegistry::new();
        registry
            .register_rpc_handler(AskHandler)
            .register_rpc_handler(OtherAskHandler);
        assert!(registry.has_rpc_handler::<Ask>());
        assert_eq!(
            registry.rpc_handler(TypeId::of::<Ask>()).map(|h| h.handler_name()),
            Some("AskHandler")
        );
        assert_eq!(
            registry.rejections(),
            &[RegistryError::DuplicateRpc {
                request: "Ask",
                handler: "OtherAskHandler"
            }]
        );
    }

    #[test]
    fn test_rejection_does_not_stop_later_registrations() {
        let mut registry = SystemRegistry::new();
        registry
            .register_awake(HealthAwake)
            .register_awake(HealthAwake)
            .register_destroy(HealthDestroy)
            .register_tick(Phase::LateUpdate, Regen);
        assert_eq!(registry.rejections().len(), 1);
        assert_eq!(registry.destroy_system_count(ComponentTypeId::of::<Health>()), 1);
        assert_eq!(registry.tick_system_count(Phase::LateUpdate), 1);
    }
}
