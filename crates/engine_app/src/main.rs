//! # engine_app
//!
//! Runs the demo simulation on top of the ECS core.
//!
//! ## Startup Sequence
//!
//! 1. Load the config file (if any) and apply command-line overrides.
//! 2. Register the demo systems and initialise modules.
//! 3. Populate the demo scene and queue some damage.
//! 4. Enter the frame loop; on exit, report one creature's health and stop
//!    every module.

mod config;
mod demo;
mod ecs_module;
mod module;
mod tick;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::EngineConfig;
use ecs_module::EcsModule;
use module::ModuleHost;
use tick::TickLoop;

#[derive(Parser)]
#[command(name = "engine_app", about = "Single-threaded ECS frame driver")]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Fixed-update steps per second
    #[arg(long)]
    fixed_rate: Option<f64>,

    /// Stop after this many frames (0 = until Ctrl-C)
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Creatures in the demo scene
    #[arg(short, long)]
    entities: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(rate) = self.tick_rate {
            config = config.with_tick_rate(rate);
        }
        if let Some(rate) = self.fixed_rate {
            config = config.with_fixed_rate(rate);
        }
        if let Some(max) = self.max_ticks {
            config = config.with_max_ticks(max);
        }
        if let Some(count) = self.entities {
            config = config.with_demo_entities(count);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let config = Args::parse().into_config()?;
    info!(?config, "engine starting");

    let mut host = ModuleHost::new();
    host.add_module(EcsModule::new(demo::registry));
    host.init_modules();

    let world = host
        .module_mut::<EcsModule>()
        .and_then(EcsModule::world_mut)
        .context("ecs module has no world")?;
    let scene = demo::populate(world, config.demo_entities);
    let mut creatures = Vec::new();
    world.find_entities::<demo::Creature>(scene, &mut creatures);
    for (i, &creature) in creatures.iter().enumerate() {
        world.post_message(creature, demo::Damage(5.0 * i as f32));
    }

    info!(modules = host.module_count(), creatures = creatures.len(), "starting modules");
    host.start_modules();
    let mut tick_loop = TickLoop::new(&config);
    tick_loop.run(&mut host).await;

    if let Some(world) = host.module_mut::<EcsModule>().and_then(EcsModule::world_mut)
        && let Some(&last) = creatures.last()
    {
        let report: demo::HealthReport = world.send_rpc(last, demo::QueryHealth).await;
        info!(entity = %last, current = report.current, max = report.max, error = report.error, "final health");
    }

    let alive = host
        .module::<EcsModule>()
        .and_then(EcsModule::world)
        .map_or(0, |world| world.entity_count());
    info!(frames = tick_loop.frame(), fixed_steps = tick_loop.fixed_steps(), alive, "simulation finished");

    host.shutdown();
    info!("engine shut down");
    Ok(())
}
