//! Collider shape components.
//!
//! Shapes are defined in the owning entity's local space: offsets are scaled
//! and rotated by the entity's transform before any query.

use glam::{Vec2, Vec3};
use hearth_component::{Component, EcsError, EcsResult};
use serde::{Deserialize, Serialize};

use crate::ray::{self, ShapeHit2D, ShapeHit3D};
use crate::transform::{Transform2D, Transform3D};

/// A 2D collision shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Collider2D {
    /// Axis-aligned in local space, oriented by the transform.
    Box {
        /// Full width and height.
        size: Vec2,
        /// Local-space centre.
        offset: Vec2,
    },
    /// A circle.
    Circle {
        /// Radius before scaling.
        radius: f32,
        /// Local-space centre.
        offset: Vec2,
    },
}

impl Collider2D {
    /// A box centred on the entity.
    #[must_use]
    pub fn cuboid(width: f32, height: f32) -> Self {
        Self::Box {
            size: Vec2::new(width, height),
            offset: Vec2::ZERO,
        }
    }

    /// A circle centred on the entity.
    #[must_use]
    pub fn circle(radius: f32) -> Self {
        Self::Circle {
            radius,
            offset: Vec2::ZERO,
        }
    }

    /// Reject non-finite or non-positive dimensions.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] naming the bad dimension.
    pub fn validate(&self) -> EcsResult<()> {
        let ok = match *self {
            Self::Box { size, offset } => {
                size.is_finite() && size.cmpgt(Vec2::ZERO).all() && offset.is_finite()
            }
            Self::Circle { radius, offset } => radius.is_finite() && radius > 0.0 && offset.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(EcsError::invalid_argument(format!("degenerate collider {self:?}")))
        }
    }

    /// Cast a normalized ray against this shape placed by `transform`.
    #[must_use]
    pub fn raycast(&self, transform: &Transform2D, origin: Vec2, dir: Vec2) -> Option<ShapeHit2D> {
        match *self {
            Self::Box { size, offset } => ray::ray_box_2d(
                origin,
                dir,
                transform.transform_point(offset),
                transform.rotation,
                size * 0.5 * transform.scale.abs(),
            ),
            Self::Circle { radius, offset } => ray::ray_circle(
                origin,
                dir,
                transform.transform_point(offset),
                radius * transform.scale.abs().max_element(),
            ),
        }
    }
}

impl Default for Collider2D {
    fn default() -> Self {
        Self::cuboid(1.0, 1.0)
    }
}

impl Component for Collider2D {
    fn type_name() -> &'static str {
        "Collider2D"
    }
}

/// A 3D collision shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Collider3D {
    /// Axis-aligned in local space, oriented by the transform.
    Box {
        /// Full extents.
        size: Vec3,
        /// Local-space centre.
        offset: Vec3,
    },
    /// A sphere.
    Sphere {
        /// Radius before scaling.
        radius: f32,
        /// Local-space centre.
        offset: Vec3,
    },
    /// A capsule along the local Y axis.
    Capsule {
        /// Radius of the swept sphere.
        radius: f32,
        /// Distance between the two hemisphere centres.
        height: f32,
        /// Local-space centre.
        offset: Vec3,
    },
}

impl Collider3D {
    /// A box centred on the entity.
    #[must_use]
    pub fn cuboid(size: Vec3) -> Self {
        Self::Box {
            size,
            offset: Vec3::ZERO,
        }
    }

    /// A sphere centred on the entity.
    #[must_use]
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            radius,
            offset: Vec3::ZERO,
        }
    }

    /// A capsule centred on the entity.
    #[must_use]
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::Capsule {
            radius,
            height,
            offset: Vec3::ZERO,
        }
    }

    /// Reject non-finite or non-positive dimensions. A capsule may have zero
    /// height (it is then a sphere).
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] naming the bad dimension.
    pub fn validate(&self) -> EcsResult<()> {
        let ok = match *self {
            Self::Box { size, offset } => {
                size.is_finite() && size.cmpgt(Vec3::ZERO).all() && offset.is_finite()
            }
            Self::Sphere { radius, offset } => radius.is_finite() && radius > 0.0 && offset.is_finite(),
            Self::Capsule {
                radius,
                height,
                offset,
            } => radius.is_finite() && radius > 0.0 && height.is_finite() && height >= 0.0 && offset.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(EcsError::invalid_argument(format!("degenerate collider {self:?}")))
        }
    }

    /// Cast a normalized ray against this shape placed by `transform`.
    #[must_use]
    pub fn raycast(&self, transform: &Transform3D, origin: Vec3, dir: Vec3) -> Option<ShapeHit3D> {
        let scale = transform.scale.abs();
        match *self {
            Self::Box { size, offset } => ray::ray_box_3d(
                origin,
                dir,
                transform.transform_point(offset),
                transform.rotation,
                size * 0.5 * scale,
            ),
            Self::Sphere { radius, offset } => ray::ray_sphere(
                origin,
                dir,
                transform.transform_point(offset),
                radius * scale.max_element(),
            ),
            Self::Capsule {
                radius,
                height,
                offset,
            } => ray::ray_capsule(
                origin,
                dir,
                transform.transform_point(offset),
                (transform.rotation * Vec3::Y).normalize_or(Vec3::Y),
                height * 0.5 * scale.y,
                radius * scale.x.max(scale.z),
            ),
        }
    }
}

impl Default for Collider3D {
    fn default() -> Self {
        Self::cuboid(Vec3::ONE)
    }
}

impl Component for Collider3D {
    fn type_name() -> &'static str {
        "Collider3D"
    }
}
