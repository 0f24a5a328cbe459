//! Velocity and rigid-body components.
//!
//! Bodies only accumulate forces, torques and impulses; the world's physics
//! phase integrates them once per update and clears the accumulators.

use glam::{Vec2, Vec3};
use hearth_component::Component;
use serde::{Deserialize, Serialize};

/// Linear and angular velocity in 2D.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity2D {
    /// Units per second.
    pub linear: Vec2,
    /// Radians per second, counter-clockwise.
    pub angular: f32,
}

impl Velocity2D {
    /// Zero velocity.
    pub const ZERO: Self = Self {
        linear: Vec2::ZERO,
        angular: 0.0,
    };

    /// A purely linear velocity.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            linear: Vec2::new(x, y),
            angular: 0.0,
        }
    }
}

impl Component for Velocity2D {
    fn type_name() -> &'static str {
        "Velocity2D"
    }
}

/// Linear and angular velocity in 3D.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity3D {
    /// Units per second.
    pub linear: Vec3,
    /// Axis-angle rate in radians per second.
    pub angular: Vec3,
}

impl Velocity3D {
    /// Zero velocity.
    pub const ZERO: Self = Self {
        linear: Vec3::ZERO,
        angular: Vec3::ZERO,
    };

    /// A purely linear velocity.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
            angular: Vec3::ZERO,
        }
    }
}

impl Component for Velocity3D {
    fn type_name() -> &'static str {
        "Velocity3D"
    }
}

/// How the integrator treats a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    /// Moved by forces, impulses and gravity.
    #[default]
    Dynamic,
    /// Never moves.
    Static,
    /// Moved by its velocity only.
    Kinematic,
}

/// A 2D rigid body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RigidBody2D {
    /// Integration mode.
    pub body_type: BodyType,
    /// Mass; must be positive for dynamic bodies.
    pub mass: f32,
    /// Fraction of linear velocity removed per second.
    pub linear_damping: f32,
    /// Fraction of angular velocity removed per second.
    pub angular_damping: f32,
    /// Multiplier on world gravity.
    pub gravity_scale: f32,
    /// Accumulated force, cleared every update.
    pub force: Vec2,
    /// Accumulated torque, cleared every update.
    pub torque: f32,
    /// Accumulated impulse, cleared every update.
    pub impulse: Vec2,
}

impl RigidBody2D {
    /// A dynamic body with the given mass.
    #[must_use]
    pub fn dynamic(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }

    /// A kinematic body.
    #[must_use]
    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Self::default()
        }
    }

    /// A static body.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            body_type: BodyType::Static,
            ..Self::default()
        }
    }

    /// Builder: set the gravity multiplier.
    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Builder: set linear damping.
    #[must_use]
    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    /// Accumulate a force for the next update.
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Accumulate an instantaneous impulse for the next update.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.impulse += impulse;
    }

    /// Accumulate a torque for the next update.
    pub fn apply_torque(&mut self, torque: f32) {
        self.torque += torque;
    }

    /// Reset every accumulator.
    pub fn clear_accumulators(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
        self.impulse = Vec2::ZERO;
    }
}

impl Default for RigidBody2D {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            mass: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            force: Vec2::ZERO,
            torque: 0.0,
            impulse: Vec2::ZERO,
        }
    }
}

impl Component for RigidBody2D {
    fn type_name() -> &'static str {
        "RigidBody2D"
    }
}

/// A 3D rigid body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RigidBody3D {
    /// Integration mode.
    pub body_type: BodyType,
    /// Mass; must be positive for dynamic bodies.
    pub mass: f32,
    /// Fraction of linear velocity removed per second.
    pub linear_damping: f32,
    /// Fraction of angular velocity removed per second.
    pub angular_damping: f32,
    /// Multiplier on world gravity.
    pub gravity_scale: f32,
    /// Accumulated force, cleared every update.
    pub force: Vec3,
    /// Accumulated torque, cleared every update.
    pub torque: Vec3,
    /// Accumulated impulse, cleared every update.
    pub impulse: Vec3,
}

impl RigidBody3D {
    /// A dynamic body with the given mass.
    #[must_use]
    pub fn dynamic(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }

    /// A kinematic body.
    #[must_use]
    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Self::default()
        }
    }

    /// A static body.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            body_type: BodyType::Static,
            ..Self::default()
        }
    }

    /// Builder: set the gravity multiplier.
    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Accumulate a force for the next update.
    pub fn apply_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Accumulate an instantaneous impulse for the next update.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.impulse += impulse;
    }

    /// Accumulate a torque for the next update.
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// Reset every accumulator.
    pub fn clear_accumulators(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
        self.impulse = Vec3::ZERO;
    }
}

impl Default for RigidBody3D {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            mass: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            impulse: Vec3::ZERO,
        }
    }
}

impl Component for RigidBody3D {
    fn type_name() -> &'static str {
        "RigidBody3D"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulators_add_up_and_clear() {
        let mut body = RigidBody2D::dynamic(2.0);
        body.apply_force(Vec2::new(1.0, 0.0));
        body.apply_force(Vec2::new(0.0, 3.0));
        body.apply_impulse(Vec2::X);
        body.apply_torque(0.5);
        assert_eq!(body.force, Vec2::new(1.0, 3.0));
        body.clear_accumulators();
        assert_eq!(body.force, Vec2::ZERO);
        assert_eq!(body.impulse, Vec2::ZERO);
        assert_eq!(body.torque, 0.0);
        assert_eq!(body.mass, 2.0);
    }

    #[test]
    fn test_constructors_pick_body_type() {
        assert_eq!(RigidBody3D::fixed().body_type, BodyType::Static);
        assert_eq!(RigidBody3D::kinematic().body_type, BodyType::Kinematic);
        assert_eq!(RigidBody3D::default().body_type, BodyType::Dynamic);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let body = RigidBody3D::dynamic(4.0).with_gravity_scale(0.5);
        let bytes = rmp_serde::to_vec_named(&body).unwrap();
        let restored: RigidBody3D = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(body, restored);
    }
}
