//! Frame loop.
//!
//! Each frame:
//!
//! 1. Flush deferred work (the world's message mailbox).
//! 2. Update.
//! 3. Late update.
//! 4. Zero or more fixed updates, paid out of an accumulator that gains one
//!    frame's worth of time per frame.
//!
//! The loop sleeps away whatever is left of the frame budget and stops after
//! `max_ticks` frames, or on Ctrl-C when unlimited.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::module::ModuleHost;

/// Upper bound on fixed steps per frame; leftover time is dropped.
pub const MAX_FIXED_STEPS_PER_FRAME: u32 = 8;

/// Frame loop state.
#[derive(Debug)]
pub struct TickLoop {
    frame: u64,
    fixed_steps: u64,
    accumulator: f64,
    frame_dt: f64,
    fixed_dt: f64,
    max_ticks: u64,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            frame: 0,
            fixed_steps: 0,
            accumulator: 0.0,
            frame_dt: config.frame_dt(),
            fixed_dt: config.fixed_dt(),
            max_ticks: config.max_ticks,
        }
    }

    /// Frames run so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Fixed steps run so far.
    #[must_use]
    pub fn fixed_steps(&self) -> u64 {
        self.fixed_steps
    }

    /// Returns `true` once the frame limit has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.max_ticks > 0 && self.frame >= self.max_ticks
    }

    /// Run one frame.
    pub async fn step(&mut self, host: &mut ModuleHost) {
        self.frame += 1;
        let dt = self.frame_dt as f32;

        host.flush().await;
        host.update(dt);
        host.late_update(dt);

        self.accumulator += self.frame_dt;
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt {
            if steps == MAX_FIXED_STEPS_PER_FRAME {
                debug!(frame = self.frame, dropped = self.accumulator, "fixed update falling behind");
                self.accumulator = 0.0;
                break;
            }
            host.fixed_update(self.fixed_dt as f32);
            self.accumulator -= self.fixed_dt;
            self.fixed_steps += 1;
            steps += 1;
        }
    }

    /// Run frames until the limit or Ctrl-C.
    pub async fn run(&mut self, host: &mut ModuleHost) {
        let budget = Duration::from_secs_f64(self.frame_dt);
        info!(
            tick_rate = 1.0 / self.frame_dt,
            fixed_rate = 1.0 / self.fixed_dt,
            max_ticks = self.max_ticks,
            "starting tick loop"
        );

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        while !self.is_finished() {
            let start = Instant::now();
            self.step(host).await;

            let elapsed = start.elapsed();
            if elapsed > budget {
                warn!(
                    frame = self.frame,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "frame exceeded time budget"
                );
                continue;
            }
            tokio::select! {
                _ = &mut interrupt => {
                    info!(frame = self.frame, "interrupted");
                    break;
                }
                () = tokio::time::sleep(budget - elapsed) => {}
            }
        }
        info!(frames = self.frame, fixed_steps = self.fixed_steps, "tick loop complete");
    }
}
