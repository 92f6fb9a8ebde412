//! Entity-addressed messages and RPC.
//!
//! [`World::send_message`] awaits every registered handler for the payload
//! type in turn. [`World::send_rpc`] awaits the single handler for the
//! request type and hands back its response; every failure path yields
//! [`RpcResponse::error`] instead. [`World::post_message`] queues a payload
//! for the next [`World::drain_messages`], which is how synchronous systems
//! talk to asynchronous handlers.

use std::any::{Any, TypeId};
use std::rc::Rc;

use engine_component::{EntityId, short_type_name};
use tracing::{debug, trace, warn};

use crate::system::RpcResponse;
use crate::world::World;

/// A queued message.
pub(crate) struct Envelope {
    entity: EntityId,
    message_type: TypeId,
    type_name: &'static str,
    payload: Box<dyn Any>,
}

impl World {
    /// Deliver `message` to every handler registered for `M`.
    ///
    /// Silently does nothing when `entity` is not in the world.
    pub async fn send_message<M: 'static>(&mut self, entity: EntityId, message: M) {
        self.deliver(entity, TypeId::of::<M>(), short_type_name::<M>(), &message)
            .await;
    }

    async fn deliver(
        &mut self,
        entity: EntityId,
        message_type: TypeId,
        type_name: &'static str,
        message: &dyn Any,
    ) {
        if !self.contains(entity) {
            debug!(entity = %entity, message = type_name, "message to missing entity dropped");
            return;
        }
        let registry = Rc::clone(&self.registry);
        let handlers = registry.message_handlers(message_type);
        if handlers.is_empty() {
            trace!(entity = %entity, message = type_name, "no message handler");
        }
        for handler in handlers {
            trace!(entity = %entity, handler = handler.handler_name(), "message");
            handler.post_erased(self, entity, message).await;
        }
    }

    /// Call the handler registered for `Req` and await its response.
    ///
    /// Returns [`RpcResponse::error`] when `entity` is not in the world, no
    /// handler is registered, or the handler answers with a different
    /// response type.
    pub async fn send_rpc<Req: 'static, Resp: RpcResponse>(
        &mut self,
        entity: EntityId,
        request: Req,
    ) -> Resp {
        let request_name = short_type_name::<Req>();
        if !self.contains(entity) {
            debug!(entity = %entity, request = request_name, "rpc to missing entity");
            return Resp::error();
        }
        let registry = Rc::clone(&self.registry);
        let Some(handler) = registry.rpc_handler(TypeId::of::<Req>()) else {
            warn!(entity = %entity, request = request_name, "no rpc handler");
            return Resp::error();
        };
        if handler.response_type() != TypeId::of::<Resp>() {
            warn!(
                handler = handler.handler_name(),
                response = short_type_name::<Resp>(),
                "rpc response type mismatch"
            );
            return Resp::error();
        }

        trace!(entity = %entity, handler = handler.handler_name(), "rpc");
        let response = handler.call_erased(self, entity, Box::new(request)).await;
        match response.downcast::<Resp>() {
            Ok(response) => *response,
            Err(_) => Resp::error(),
        }
    }

    /// Queue `message` for the next [`World::drain_messages`].
    pub fn post_message<M: 'static>(&mut self, entity: EntityId, message: M) {
        self.mailbox.push_back(Envelope {
            entity,
            message_type: TypeId::of::<M>(),
            type_name: short_type_name::<M>(),
            payload: Box::new(message),
        });
    }

    /// Number of queued messages.
    #[must_use]
    pub fn queued_messages(&self) -> usize {
        self.mailbox.len()
    }

    /// Deliver the messages that were queued when the call started, oldest
    /// first. Messages posted by handlers during the drain wait for the next
    /// one. Returns how many were delivered.
    pub async fn drain_messages(&mut self) -> usize {
        let pending = self.mailbox.len();
        for _ in 0..pending {
            let Some(envelope) = self.mailbox.pop_front() else {
                break;
            };
            self.deliver(
                envelope.entity,
                envelope.message_type,
                envelope.type_name,
                &*envelope.payload,
            )
            .await;
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use engine_component::Component;
    use futures::FutureExt;
    use futures::executor::block_on;
    use futures::future::LocalBoxFuture;

    use super::*;
    use crate::registry::SystemRegistry;
    use crate::system::{MessageHandler, RpcHandler};

    #[derive(Debug)]
    struct Health(i32);
    impl Component for Health {}

    struct Damage(i32);

    struct QueryHealth;

    #[derive(Debug, Default)]
    struct HealthReply {
        hp: i32,
        error: bool,
    }

    impl RpcResponse for HealthReply {
        fn set_error(&mut self) {
            self.error = true;
        }
        fn is_error(&self) -> bool {
            self.error
        }
    }

    thread_local! {
        static SEEN: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn seen() -> Vec<String> {
        SEEN.with(|s| std::mem::take(&mut *s.borrow_mut()))
    }

    struct ApplyDamage;
    impl MessageHandler for ApplyDamage {
        type Message = Damage;
        fn post<'a>(
            &'a self,
            world: &'a mut World,
            entity: EntityId,
            message: &'a Damage,
        ) -> LocalBoxFuture<'a, ()> {
            async move {
                if let Some(h) = world.get_component_mut::<Health>(entity) {
                    h.0 -= message.0;
                }
                SEEN.with(|s| s.borrow_mut().push(format!("apply {}", message.0)));
            }
            .boxed_local()
        }
    }

    /// Echoes damage back as a new queued message.
    struct LogDamage;
    impl MessageHandler for LogDamage {
        type Message = Damage;
        fn post<'a>(
            &'a self,
            world: &'a mut World,
            entity: EntityId,
            message: &'a Damage,
        ) -> LocalBoxFuture<'a, ()> {
            async move {
                SEEN.with(|s| s.borrow_mut().push(format!("log {}", message.0)));
                if message.0 > 100 {
                    world.post_message(entity, Damage(message.0 - 100));
                }
            }
            .boxed_local()
        }
    }

    struct AnswerHealth;
    impl RpcHandler for AnswerHealth {
        type Request = QueryHealth;
        type Response = HealthReply;
        fn call<'a>(
            &'a self,
            world: &'a mut World,
            entity: EntityId,
            _: QueryHealth,
        ) -> LocalBoxFuture<'a, HealthReply> {
            async move {
                SEEN.with(|s| s.borrow_mut().push("rpc".to_owned()));
                match world.get_component::<Health>(entity) {
                    Some(h) => HealthReply { hp: h.0, error: false },
                    None => HealthReply::error(),
                }
            }
            .boxed_local()
        }
    }

    fn world() -> World {
        seen();
        let mut registry = SystemRegistry::new();
        registry
            .register_message_handler(ApplyDamage)
            .register_message_handler(LogDamage)
            .register_rpc_handler(AnswerHealth);
        World::new(registry)
    }

    #[test]
    fn test_send_message_runs_handlers_in_order() {
        let mut world = world();
        let e = world.spawn();
        world.add_component(e, Health(50));

        block_on(world.send_message(e, Damage(20)));
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 30);
        assert_eq!(seen(), vec!["apply 20", "log 20"]);
    }

    #[test]
    fn test_send_message_to_missing_entity_is_silent() {
        let mut world = world();
        block_on(world.send_message(EntityId(77), Damage(1)));
        block_on(world.send_message(EntityId(0), Damage(1)));
        assert!(seen().is_empty());
    }

    #[test]
    fn test_unhandled_message_type_is_ignored() {
        let mut world = world();
        let e = world.spawn();
        block_on(world.send_message(e, "nobody listens"));
        assert!(seen().is_empty());
    }

    #[test]
    fn test_rpc_returns_handler_response() {
        let mut world = world();
        let e = world.spawn();
        world.add_component(e, Health(42));

        let reply: HealthReply = block_on(world.send_rpc(e, QueryHealth));
        assert!(!reply.is_error());
        assert_eq!(reply.hp, 42);
    }

    #[test]
    fn test_rpc_to_missing_entity_skips_handler() {
        let mut world = world();
        let reply: HealthReply = block_on(world.send_rpc(EntityId(12), QueryHealth));
        assert!(reply.is_error());
        assert!(seen().is_empty(), "handler must not run");
    }

    #[test]
    fn test_rpc_without_handler_is_error() {
        let mut world = world();
        let e = world.spawn();
        let reply: HealthReply = block_on(world.send_rpc(e, 5_u32));
        assert!(reply.is_error());
    }

    #[test]
    fn test_drain_delivers_in_post_order() {
        let mut world = world();
        let a = world.spawn();
        let b = world.spawn();
        world.add_component(a, Health(100));
        world.add_component(b, Health(100));
        world.post_message(a, Damage(1));
        world.post_message(b, Damage(2));
        world.post_message(EntityId(999), Damage(3));

        assert_eq!(block_on(world.drain_messages()), 3);
        assert_eq!(world.queued_messages(), 0);
        assert_eq!(seen(), vec!["apply 1", "log 1", "apply 2", "log 2"]);
        assert_eq!(world.get_component::<Health>(b).unwrap().0, 98);
    }

    #[test]
    fn test_messages_posted_while_draining_wait() {
        let mut world = world();
        let e = world.spawn();
        world.post_message(e, Damage(150));

        assert_eq!(block_on(world.drain_messages()), 1);
        assert_eq!(world.queued_messages(), 1);
        seen();

        assert_eq!(block_on(world.drain_messages()), 1);
        assert_eq!(seen(), vec!["apply 50", "log 50"]);
    }
}
