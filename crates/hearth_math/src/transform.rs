//! 2D and 3D transform components.
//!
//! Nearly every spatial entity carries one of these. Collider offsets, ray
//! queries and the physics integrator all work through them.

use glam::{Mat3, Mat4, Quat, Vec2, Vec3};
use hearth_component::Component;
use serde::{Deserialize, Serialize};

/// A 2D transform: position, rotation in radians (counter-clockwise) and
/// per-axis scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform2D {
    /// Position in the parent's space; world space for entities without a parent.
    pub position: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
    /// Per-axis scale.
    pub scale: Vec2,
}

impl Transform2D {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    /// A transform at `position` with default rotation and scale.
    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Shorthand for [`Transform2D::from_position`] from components.
    #[must_use]
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self::from_position(Vec2::new(x, y))
    }

    /// The 3×3 homogeneous model matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Mat3 {
        Mat3::from_scale_angle_translation(self.scale, self.rotation, self.position)
    }

    /// Map a local-space point to world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.position + Vec2::from_angle(self.rotation).rotate(local * self.scale)
    }

    /// Place `child`, given relative to `self`, in `self`'s parent space.
    ///
    /// Rotations add and scales multiply per axis; a non-uniform parent
    /// scale under a rotated child is approximated, not sheared.
    #[must_use]
    pub fn mul_transform(&self, child: &Self) -> Self {
        Self {
            position: self.transform_point(child.position),
            rotation: self.rotation + child.rotation,
            scale: self.scale * child.scale,
        }
    }

    /// Rotate a local-space direction into world space (scale ignored).
    #[must_use]
    pub fn rotate_vector(&self, local: Vec2) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(local)
    }

    /// Translate by `offset`.
    #[must_use]
    pub fn translated(mut self, offset: Vec2) -> Self {
        self.position += offset;
        self
    }

    /// Rotate by `radians`.
    #[must_use]
    pub fn rotated(mut self, radians: f32) -> Self {
        self.rotation += radians;
        self
    }

    /// Multiply the scale uniformly.
    #[must_use]
    pub fn scaled(mut self, factor: f32) -> Self {
        self.scale *= factor;
        self
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform2D {
    fn type_name() -> &'static str {
        "Transform2D"
    }
}

/// A 3D transform: position, rotation and per-axis scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform3D {
    /// Position in the parent's space; world space for entities without a parent.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Transform3D {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// A transform at `position` with default rotation and scale.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// A transform with position and rotation.
    #[must_use]
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::IDENTITY
        }
    }

    /// The 4×4 model matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Map a local-space point to world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (local * self.scale)
    }

    /// Place `child`, given relative to `self`, in `self`'s parent space.
    /// As [`Transform2D::mul_transform`], non-uniform scale is approximated.
    #[must_use]
    pub fn mul_transform(&self, child: &Self) -> Self {
        Self {
            position: self.transform_point(child.position),
            rotation: (self.rotation * child.rotation).normalize(),
            scale: self.scale * child.scale,
        }
    }

    /// Translate by `offset`.
    #[must_use]
    pub fn translated(mut self, offset: Vec3) -> Self {
        self.position += offset;
        self
    }

    /// Rotate by `rotation`, applied after the current one.
    #[must_use]
    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = rotation * self.rotation;
        self
    }

    /// Multiply the scale uniformly.
    #[must_use]
    pub fn scaled(mut self, factor: f32) -> Self {
        self.scale *= factor;
        self
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform3D {
    fn type_name() -> &'static str {
        "Transform3D"
    }
}
