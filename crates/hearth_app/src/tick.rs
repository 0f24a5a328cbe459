//! Fixed-rate frame loop.
//!
//! Each frame:
//!
//! 1. Advance the world by one frame (`World::update`).
//! 2. Drain the replication outbox, encoding each envelope.
//! 3. Sleep out the rest of the frame budget.

use std::time::{Duration, Instant};

use anyhow::{Result, ensure};
use hearth_world::{FrameReport, World};
use tracing::{debug, info, warn};

/// Configuration for the frame loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target frames per second.
    pub tick_rate: f64,
    /// Maximum number of frames to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Totals over a [`TickLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub failures: usize,
    pub envelopes: usize,
    pub envelope_bytes: usize,
    pub overruns: u64,
}

/// Drives one world at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    config: TickConfig,
    world: World,
    summary: RunSummary,
}

impl TickLoop {
    /// Create a loop that owns `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            config,
            world,
            summary: RunSummary::default(),
        }
    }

    /// Frames run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.summary.ticks
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Give the world back.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Run one frame of `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Result<FrameReport> {
        let report = self.world.update(dt as f32)?;
        self.summary.ticks += 1;
        self.summary.failures += report.failure_count();

        for envelope in self.world.drain_outbox() {
            let bytes = envelope.to_bytes()?;
            self.summary.envelopes += 1;
            self.summary.envelope_bytes += bytes.len();
        }

        debug!(
            tick_id = self.summary.ticks,
            frame = report.frame,
            dt = report.delta_seconds,
            deltas = report.deltas_queued,
            failures = report.failure_count(),
            "tick done"
        );
        Ok(report)
    }

    /// Run for the configured number of frames, or until an error.
    pub fn run(&mut self) -> Result<RunSummary> {
        ensure!(
            self.config.tick_rate.is_finite() && self.config.tick_rate > 0.0,
            "tick rate must be finite and positive, got {}",
            self.config.tick_rate
        );
        let tick_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let mut tick_count = 0u64;

        info!(
            world = %self.world.id(),
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick(tick_duration.as_secs_f64())?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(
                    ticks = tick_count,
                    failures = self.summary.failures,
                    envelopes = self.summary.envelopes,
                    "tick loop complete"
                );
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                self.summary.overruns += 1;
                warn!(
                    tick_id = self.summary.ticks,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use hearth_math::Transform2D;

    use super::*;

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), World::new());
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0).unwrap();
        assert_eq!(tick_loop.tick_id(), 1);
        assert_eq!(tick_loop.world().time().frame_count(), 1);
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks: 5,
        };
        let mut tick_loop = TickLoop::new(config, World::new());
        let summary = tick_loop.run().unwrap();
        assert_eq!(summary.ticks, 5);
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_outbox_is_drained_each_tick() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add(e, Transform2D::from_xy(1.0, 1.0)).unwrap();
        world.replicate_entity(e).unwrap();

        let mut tick_loop = TickLoop::new(TickConfig::default(), world);
        let report = tick_loop.tick(1.0 / 60.0).unwrap();
        assert_eq!(report.deltas_queued, 1);
        assert_eq!(tick_loop.world().outbox_len(), 0);
    }

    #[test]
    fn test_bad_rate_is_rejected() {
        let config = TickConfig {
            tick_rate: 0.0,
            max_ticks: 1,
        };
        assert!(TickLoop::new(config, World::new()).run().is_err());
    }
}
