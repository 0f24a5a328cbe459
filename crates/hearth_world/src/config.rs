//! World configuration.
//!
//! Loaded from human-edited JSON. Every field has a default, so a config
//! file only needs the values it overrides.

use std::path::Path;

use hearth_component::{EcsError, EcsResult};
use hearth_math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Time controller settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Frame rate the host loop aims for.
    pub target_fps: f32,
    /// Multiplier applied to wall-clock deltas.
    pub time_scale: f32,
    /// Upper bound on one frame's simulated delta, in seconds.
    pub max_step: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            time_scale: 1.0,
            max_step: 0.25,
        }
    }
}

/// Physics phase settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity applied to dynamic 2D bodies.
    pub gravity_2d: Vec2,
    /// Gravity applied to dynamic 3D bodies.
    pub gravity_3d: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_2d: Vec2::new(0.0, -9.81),
            gravity_3d: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

/// Replication settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Send rate for entities replicated without explicit settings.
    pub default_rate_hz: f32,
    /// Envelopes the outbox holds before the oldest are dropped.
    pub outbox_capacity: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            default_rate_hz: 20.0,
            outbox_capacity: 4096,
        }
    }
}

/// Configuration for one world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Time controller settings.
    pub time: TimeConfig,
    /// Physics settings.
    pub physics: PhysicsConfig,
    /// Replication settings.
    pub replication: ReplicationConfig,
}

impl WorldConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] if the JSON is malformed or a value is
    /// out of range.
    pub fn from_json_str(json: &str) -> EcsResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EcsError::invalid_argument(format!("world config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// [`EcsError::Io`] if the file cannot be read, otherwise as
    /// [`WorldConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> EcsResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Builder: set the target frame rate.
    #[must_use]
    pub fn with_target_fps(mut self, fps: f32) -> Self {
        self.time.target_fps = fps;
        self
    }

    /// Builder: set the time scale.
    #[must_use]
    pub fn with_time_scale(mut self, scale: f32) -> Self {
        self.time.time_scale = scale;
        self
    }

    /// Builder: set the maximum simulated step.
    #[must_use]
    pub fn with_max_step(mut self, max_step: f32) -> Self {
        self.time.max_step = max_step;
        self
    }

    /// Builder: set 2D gravity.
    #[must_use]
    pub fn with_gravity_2d(mut self, gravity: Vec2) -> Self {
        self.physics.gravity_2d = gravity;
        self
    }

    /// Builder: set 3D gravity.
    #[must_use]
    pub fn with_gravity_3d(mut self, gravity: Vec3) -> Self {
        self.physics.gravity_3d = gravity;
        self
    }

    /// Builder: set the default replication rate.
    #[must_use]
    pub fn with_replication_rate(mut self, rate_hz: f32) -> Self {
        self.replication.default_rate_hz = rate_hz;
        self
    }

    /// Builder: set the outbox capacity.
    #[must_use]
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.replication.outbox_capacity = capacity;
        self
    }

    /// Check every value.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] naming the first bad field.
    pub fn validate(&self) -> EcsResult<()> {
        positive("time.target_fps", self.time.target_fps)?;
        positive("time.time_scale", self.time.time_scale)?;
        positive("time.max_step", self.time.max_step)?;
        positive("replication.default_rate_hz", self.replication.default_rate_hz)?;
        if self.replication.outbox_capacity == 0 {
            return Err(EcsError::invalid_argument(
                "replication.outbox_capacity must be at least 1",
            ));
        }
        if !self.physics.gravity_2d.is_finite() || !self.physics.gravity_3d.is_finite() {
            return Err(EcsError::invalid_argument("physics gravity must be finite"));
        }
        Ok(())
    }
}

/// Require a finite, strictly positive value.
pub(crate) fn positive(field: &str, value: f32) -> EcsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EcsError::invalid_argument(format!(
            "{field} must be finite and positive, got {value}"
        )))
    }
}
