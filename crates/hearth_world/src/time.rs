//! Frame timing.
//!
//! The [`TimeController`] turns the host's wall-clock delta into the
//! simulated delta every phase sees:
//!
//! ```text
//! delta_seconds = min(wall_delta * time_scale, max_step)
//! ```

use hearth_component::EcsResult;
use serde::{Deserialize, Serialize};

use crate::config::{TimeConfig, positive};

/// Weight of the newest sample in the measured frame-rate average.
const FPS_SMOOTHING: f32 = 0.1;

/// A copy of the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeState {
    /// Simulated seconds of the last tick.
    pub delta_seconds: f32,
    /// Simulated seconds since the first tick.
    pub total_seconds: f64,
    /// Ticks so far.
    pub frame_count: u64,
    /// Frame rate the host aims for.
    pub target_fps: f32,
    /// Multiplier on wall-clock deltas.
    pub time_scale: f32,
    /// Upper bound on `delta_seconds`.
    pub max_step: f32,
    /// Smoothed frames per second, from wall-clock deltas.
    pub fps: f32,
}

/// Advances simulated time once per update.
#[derive(Debug, Clone)]
pub struct TimeController {
    state: TimeState,
    /// Smoothed wall-clock delta, `None` until the first positive sample.
    average_wall: Option<f32>,
    /// Sanitised wall-clock delta of the last tick, before scaling.
    wall_delta: f32,
}

impl TimeController {
    /// A controller at frame zero with the given settings.
    #[must_use]
    pub fn new(config: TimeConfig) -> Self {
        Self {
            state: TimeState {
                delta_seconds: 0.0,
                total_seconds: 0.0,
                frame_count: 0,
                target_fps: config.target_fps,
                time_scale: config.time_scale,
                max_step: config.max_step,
                fps: 0.0,
            },
            average_wall: None,
            wall_delta: 0.0,
        }
    }

    /// Advance one frame. Negative or non-finite wall deltas count as zero.
    pub fn tick(&mut self, wall_delta: f32) -> f32 {
        let wall = if wall_delta.is_finite() && wall_delta > 0.0 {
            wall_delta
        } else {
            0.0
        };
        let dt = (wall * self.state.time_scale).min(self.state.max_step);
        self.wall_delta = wall;

        self.state.delta_seconds = dt;
        self.state.total_seconds += f64::from(dt);
        self.state.frame_count += 1;

        if wall > 0.0 {
            let average = match self.average_wall {
                Some(avg) => avg + (wall - avg) * FPS_SMOOTHING,
                None => wall,
            };
            self.average_wall = Some(average);
            self.state.fps = 1.0 / average;
        }
        dt
    }

    /// Set the target frame rate.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`](hearth_component::EcsError::InvalidArgument)
    /// for zero, negative or non-finite values.
    pub fn set_target_fps(&mut self, fps: f32) -> EcsResult<()> {
        positive("target_fps", fps)?;
        self.state.target_fps = fps;
        Ok(())
    }

    /// Set the time scale. Takes effect on the next tick.
    ///
    /// # Errors
    ///
    /// As [`TimeController::set_target_fps`].
    pub fn set_time_scale(&mut self, scale: f32) -> EcsResult<()> {
        positive("time_scale", scale)?;
        self.state.time_scale = scale;
        Ok(())
    }

    /// Set the maximum simulated step. Takes effect on the next tick.
    ///
    /// # Errors
    ///
    /// As [`TimeController::set_target_fps`].
    pub fn set_max_step(&mut self, max_step: f32) -> EcsResult<()> {
        positive("max_step", max_step)?;
        self.state.max_step = max_step;
        Ok(())
    }

    /// Simulated seconds of the last tick.
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.state.delta_seconds
    }

    /// Wall-clock seconds of the last tick, unscaled and unclamped.
    #[must_use]
    pub fn wall_delta(&self) -> f32 {
        self.wall_delta
    }

    /// Ticks so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.state.frame_count
    }

    /// A copy of the full state.
    #[must_use]
    pub fn snapshot(&self) -> TimeState {
        self.state
    }
}

impl Default for TimeController {
    fn default() -> Self {
        Self::new(TimeConfig::default())
    }
}
