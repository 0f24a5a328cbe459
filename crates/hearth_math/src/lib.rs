//! # hearth_math
//!
//! Spatial component kinds for the world core. Re-exports [`glam`] for linear
//! algebra and defines transforms, velocities, rigid bodies, colliders and
//! the ray-shape math behind world raycasts. Every kind here implements
//! [`Component`](hearth_component::Component).

pub mod body;
pub mod collider;
pub mod ray;
pub mod tags;
pub mod transform;

// Re-export glam types for convenience.
pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

pub use body::{BodyType, RigidBody2D, RigidBody3D, Velocity2D, Velocity3D};
pub use collider::{Collider2D, Collider3D};
pub use ray::{ShapeHit2D, ShapeHit3D};
pub use tags::{Name, SpriteRef};
pub use transform::{Transform2D, Transform3D};
