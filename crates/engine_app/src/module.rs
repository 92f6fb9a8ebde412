//! Game modules and their host.
//!
//! A [`GameModule`] is a long-lived subsystem with lifecycle hooks. The
//! [`ModuleHost`] owns modules in insertion order and forwards each frame
//! phase to all of them. Hooks only run once [`ModuleHost::init_modules`]
//! has been called and stop after [`ModuleHost::shutdown`].

use std::any::{Any, TypeId};

use engine_component::short_type_name;
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tracing::{debug, info, warn};

/// Downcasting support for [`GameModule`] trait objects.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A subsystem driven by the frame loop. Every hook defaults to a no-op.
pub trait GameModule: AsAny + 'static {
    /// Called once by [`ModuleHost::init_modules`].
    fn on_init(&mut self) {}

    /// Called once by [`ModuleHost::start_modules`], after every module has
    /// been initialised.
    fn on_start(&mut self) {}

    /// Deliver deferred asynchronous work. Awaited at the start of a frame.
    fn on_flush(&mut self) -> LocalBoxFuture<'_, ()> {
        future::ready(()).boxed_local()
    }

    fn on_update(&mut self, _dt: f32) {}

    fn on_late_update(&mut self, _dt: f32) {}

    fn on_fixed_update(&mut self, _dt: f32) {}

    /// Called once by [`ModuleHost::shutdown`].
    fn on_stop(&mut self) {}
}

struct ModuleEntry {
    type_id: TypeId,
    name: &'static str,
    module: Box<dyn GameModule>,
}

/// Owns the game modules and fans lifecycle calls out to them.
#[derive(Default)]
pub struct ModuleHost {
    modules: Vec<ModuleEntry>,
    initialized: bool,
    stopped: bool,
}

impl ModuleHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. A second module of the same type is refused.
    pub fn add_module<M: GameModule>(&mut self, module: M) -> bool {
        let type_id = TypeId::of::<M>();
        let name = short_type_name::<M>();
        if self.modules.iter().any(|m| m.type_id == type_id) {
            warn!(module = name, "duplicated module");
            return false;
        }
        debug!(module = name, "module added");
        self.modules.push(ModuleEntry {
            type_id,
            name,
            module: Box::new(module),
        });
        true
    }

    /// Borrow the module of type `M`.
    #[must_use]
    pub fn module<M: GameModule>(&self) -> Option<&M> {
        self.modules
            .iter()
            .find_map(|m| m.module.as_ref().as_any().downcast_ref::<M>())
    }

    /// Mutably borrow the module of type `M`.
    pub fn module_mut<M: GameModule>(&mut self) -> Option<&mut M> {
        self.modules
            .iter_mut()
            .find_map(|m| m.module.as_mut().as_any_mut().downcast_mut::<M>())
    }

    /// Number of modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` while hooks are being forwarded.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.initialized && !self.stopped
    }

    /// Initialise every module. Only the first call has an effect.
    pub fn init_modules(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        for entry in &mut self.modules {
            debug!(module = entry.name, "init");
            entry.module.on_init();
        }
        info!(modules = self.modules.len(), "modules initialised");
    }

    /// Start every module.
    pub fn start_modules(&mut self) {
        if !self.is_running() {
            return;
        }
        for entry in &mut self.modules {
            entry.module.on_start();
        }
    }

    /// Await every module's deferred work, in module order.
    pub async fn flush(&mut self) {
        if !self.is_running() {
            return;
        }
        for entry in &mut self.modules {
            entry.module.on_flush().await;
        }
    }

    pub fn update(&mut self, dt: f32) {
        if self.is_running() {
            self.modules.iter_mut().for_each(|m| m.module.on_update(dt));
        }
    }

    pub fn late_update(&mut self, dt: f32) {
        if self.is_running() {
            self.modules.iter_mut().for_each(|m| m.module.on_late_update(dt));
        }
    }

    pub fn fixed_update(&mut self, dt: f32) {
        if self.is_running() {
            self.modules.iter_mut().for_each(|m| m.module.on_fixed_update(dt));
        }
    }

    /// Stop every module. Only the first call after init has an effect.
    pub fn shutdown(&mut self) {
        if !self.is_running() {
            return;
        }
        self.stopped = true;
        for entry in &mut self.modules {
            debug!(module = entry.name, "stop");
            entry.module.on_stop();
        }
        info!("modules stopped");
    }
}
