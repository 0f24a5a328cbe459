//! Raycasts with C-layout vectors and hits.

use hearth_component::ErrorCode;
use hearth_math::{Vec2, Vec3};
use hearth_world::{RaycastHit2D, RaycastHit3D};

use crate::error::{out_param, status};
use crate::handle::{WorldHandle, with_world};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthVec2 {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<HearthVec2> for Vec2 {
    fn from(v: HearthVec2) -> Self {
        Vec2::new(v.x, v.y)
    }
}

impl From<Vec2> for HearthVec2 {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<HearthVec3> for Vec3 {
    fn from(v: HearthVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for HearthVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Nearest 2D hit. `entity` is `u64::MAX` on a miss.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthRaycastHit2D {
    pub hit: bool,
    pub point: HearthVec2,
    pub normal: HearthVec2,
    pub distance: f32,
    pub entity: u64,
}

impl From<RaycastHit2D> for HearthRaycastHit2D {
    fn from(hit: RaycastHit2D) -> Self {
        Self {
            hit: hit.hit,
            point: hit.point.into(),
            normal: hit.normal.into(),
            distance: hit.distance,
            entity: hit.entity.to_bits(),
        }
    }
}

/// Nearest 3D hit. `entity` is `u64::MAX` on a miss.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthRaycastHit3D {
    pub hit: bool,
    pub point: HearthVec3,
    pub normal: HearthVec3,
    pub distance: f32,
    pub entity: u64,
}

impl From<RaycastHit3D> for HearthRaycastHit3D {
    fn from(hit: RaycastHit3D) -> Self {
        Self {
            hit: hit.hit,
            point: hit.point.into(),
            normal: hit.normal.into(),
            distance: hit.distance,
            entity: hit.entity.to_bits(),
        }
    }
}

/// Cast a 2D ray and write the nearest hit to `out_hit`.
///
/// # Safety
///
/// `out_hit` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_raycast2d(
    world: WorldHandle,
    origin: HearthVec2,
    direction: HearthVec2,
    max_distance: f32,
    out_hit: *mut HearthRaycastHit2D,
) -> ErrorCode {
    status(out_param(out_hit, "out_hit").and_then(|out| {
        with_world(world, |w| {
            let hit = w.raycast2d(origin.into(), direction.into(), max_distance)?;
            unsafe { out.write(hit.into()) };
            Ok(())
        })
    }))
}

/// Cast a 3D ray and write the nearest hit to `out_hit`.
///
/// # Safety
///
/// `out_hit` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_raycast3d(
    world: WorldHandle,
    origin: HearthVec3,
    direction: HearthVec3,
    max_distance: f32,
    out_hit: *mut HearthRaycastHit3D,
) -> ErrorCode {
    status(out_param(out_hit, "out_hit").and_then(|out| {
        with_world(world, |w| {
            let hit = w.raycast3d(origin.into(), direction.into(), max_distance)?;
            unsafe { out.write(hit.into()) };
            Ok(())
        })
    }))
}
