//! Steering behaviours.
//!
//! [`steering_force`] is pure: given the agent's kinematics and a target
//! point it returns the desired change in velocity. The AI phase resolves
//! targets first (predicting pursued entities, picking wander points) and
//! then clamps the force by `max_force` and the resulting speed by
//! `max_speed`.

use hearth_component::{Component, EcsError, EcsResult, Entity};
use hearth_math::Vec3;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Longest look-ahead used when predicting a pursued entity, in seconds.
const MAX_PREDICTION: f32 = 1.0;

/// What the agent steers toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SteeringMode {
    /// Full speed toward the target.
    Seek,
    /// Full speed away from the target.
    Flee,
    /// Toward the target, slowing inside `slowing_radius`.
    Arrive {
        /// Distance at which braking starts.
        slowing_radius: f32,
    },
    /// Seek where another entity is about to be.
    Pursue(Entity),
    /// Flee from where another entity is about to be.
    Evade(Entity),
    /// Drift along a jittered circle projected ahead of the agent.
    Wander {
        /// Radius of the wander circle.
        radius: f32,
        /// Distance of the circle ahead of the agent.
        distance: f32,
        /// Largest change of the wander angle per second, in radians.
        jitter: f32,
    },
}

/// Desired velocity change for `mode` toward `target`.
///
/// For [`SteeringMode::Pursue`] and [`SteeringMode::Evade`], `target` is the
/// already-predicted position; for [`SteeringMode::Wander`] it is the wander
/// point.
#[must_use]
pub fn steering_force(
    mode: &SteeringMode,
    position: Vec3,
    velocity: Vec3,
    target: Vec3,
    max_speed: f32,
) -> Vec3 {
    match *mode {
        SteeringMode::Seek | SteeringMode::Pursue(_) | SteeringMode::Wander { .. } => {
            (target - position).normalize_or_zero() * max_speed - velocity
        }
        SteeringMode::Flee | SteeringMode::Evade(_) => {
            (position - target).normalize_or_zero() * max_speed - velocity
        }
        SteeringMode::Arrive { slowing_radius } => {
            let offset = target - position;
            let distance = offset.length();
            if distance < 1e-6 {
                return -velocity;
            }
            let speed = if distance < slowing_radius {
                max_speed * distance / slowing_radius
            } else {
                max_speed
            };
            offset / distance * speed - velocity
        }
    }
}

/// Where a moving target will be once the agent could reach it.
#[must_use]
pub fn predict_position(
    agent_position: Vec3,
    max_speed: f32,
    target_position: Vec3,
    target_velocity: Vec3,
) -> Vec3 {
    let look_ahead = if max_speed > 0.0 {
        (agent_position.distance(target_position) / max_speed).min(MAX_PREDICTION)
    } else {
        0.0
    };
    target_position + target_velocity * look_ahead
}

/// A steering behaviour attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Steering {
    /// The active behaviour.
    pub mode: SteeringMode,
    /// Target point for seek, flee and arrive.
    pub target: Vec3,
    /// Speed limit.
    pub max_speed: f32,
    /// Limit on the velocity change per second.
    pub max_force: f32,
    /// Disabled behaviours are skipped.
    pub enabled: bool,
    wander_angle: f32,
    rng_state: u64,
}

impl Steering {
    /// A behaviour with the given limits, targeting the origin.
    #[must_use]
    pub fn new(mode: SteeringMode, max_speed: f32, max_force: f32) -> Self {
        Self {
            mode,
            target: Vec3::ZERO,
            max_speed,
            max_force,
            enabled: true,
            wander_angle: 0.0,
            rng_state: 0,
        }
    }

    /// Builder: set the target point.
    #[must_use]
    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Builder: seed the wander generator.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_state = seed;
        self
    }

    /// Reject negative or non-finite limits.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] naming the bad limit.
    pub fn validate(&self) -> EcsResult<()> {
        for (field, value) in [("max_speed", self.max_speed), ("max_force", self.max_force)] {
            if !value.is_finite() || value < 0.0 {
                return Err(EcsError::invalid_argument(format!(
                    "steering {field} must be finite and non-negative, got {value}"
                )));
            }
        }
        if let SteeringMode::Arrive { slowing_radius } = self.mode {
            if !slowing_radius.is_finite() || slowing_radius <= 0.0 {
                return Err(EcsError::invalid_argument("arrive slowing_radius must be positive"));
            }
        }
        Ok(())
    }

    /// Advance the wander angle and return the wander point. `planar` picks
    /// the XY plane for 2D agents, otherwise the XZ plane.
    ///
    /// Draws come from a ChaCha8 stream reseeded from the stored state, so
    /// the same seed always wanders the same way.
    pub fn next_wander_point(
        &mut self,
        position: Vec3,
        velocity: Vec3,
        planar: bool,
        dt: f32,
    ) -> Vec3 {
        let SteeringMode::Wander {
            radius,
            distance,
            jitter,
        } = self.mode
        else {
            return self.target;
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.rng_state);
        self.wander_angle += rng.gen_range(-1.0f32..=1.0) * jitter * dt;
        self.rng_state = rng.next_u64();

        let fallback = if planar { Vec3::X } else { Vec3::Z };
        let heading = velocity.normalize_or(fallback);
        let (sin, cos) = self.wander_angle.sin_cos();
        let offset = if planar {
            Vec3::new(cos, sin, 0.0)
        } else {
            Vec3::new(cos, 0.0, sin)
        };
        position + heading * distance + offset * radius
    }
}

impl Default for Steering {
    fn default() -> Self {
        Self::new(SteeringMode::Seek, 5.0, 10.0)
    }
}

impl Component for Steering {
    fn type_name() -> &'static str {
        "Steering"
    }
}
