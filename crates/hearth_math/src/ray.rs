//! Ray-shape intersection.
//!
//! Every function takes a **normalized** direction and returns the first
//! surface point along the ray at a non-negative distance. A ray whose
//! origin is inside the shape hits at distance `0` with the normal pointing
//! back along the ray.

use glam::{Quat, Vec2, Vec3};

const PARALLEL_EPSILON: f32 = 1e-8;

/// A 2D ray-shape hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit2D {
    /// Where the ray meets the surface.
    pub point: Vec2,
    /// Unit surface normal at `point`.
    pub normal: Vec2,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// A 3D ray-shape hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit3D {
    /// Where the ray meets the surface.
    pub point: Vec3,
    /// Unit surface normal at `point`.
    pub normal: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// Outcome of a slab test in the shape's local frame.
enum Slab {
    /// Origin inside the box.
    Inside,
    /// Entered at `t` through the face on `axis` whose outward normal has `sign`.
    Enter { t: f32, axis: usize, sign: f32 },
}

fn slab_test(origin: &[f32], dir: &[f32], half: &[f32]) -> Option<Slab> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0;
    let mut enter_sign = 0.0;

    for axis in 0..origin.len() {
        let (o, d, h) = (origin[axis], dir[axis], half[axis]);
        if d.abs() < PARALLEL_EPSILON {
            if o.abs() > h {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t_near = (-h - o) * inv;
        let mut t_far = (h - o) * inv;
        // Moving in +d enters through the negative face.
        let sign = if d > 0.0 { -1.0 } else { 1.0 };
        if t_near > t_far {
            std::mem::swap(&mut t_near, &mut t_far);
        }
        if t_near > t_enter {
            t_enter = t_near;
            enter_axis = axis;
            enter_sign = sign;
        }
        t_exit = t_exit.min(t_far);
        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 {
        return None;
    }
    if t_enter < 0.0 {
        return Some(Slab::Inside);
    }
    Some(Slab::Enter {
        t: t_enter,
        axis: enter_axis,
        sign: enter_sign,
    })
}

/// Ray against a box of half extents `half`, centred at `center` and rotated
/// by `angle` radians.
#[must_use]
pub fn ray_box_2d(origin: Vec2, dir: Vec2, center: Vec2, angle: f32, half: Vec2) -> Option<ShapeHit2D> {
    let rot = Vec2::from_angle(angle);
    let inv = Vec2::from_angle(-angle);
    let local_origin = inv.rotate(origin - center);
    let local_dir = inv.rotate(dir);

    match slab_test(&local_origin.to_array(), &local_dir.to_array(), &half.to_array())? {
        Slab::Inside => Some(ShapeHit2D {
            point: origin,
            normal: -dir,
            distance: 0.0,
        }),
        Slab::Enter { t, axis, sign } => {
            let mut local_normal = Vec2::ZERO;
            local_normal[axis] = sign;
            Some(ShapeHit2D {
                point: origin + dir * t,
                normal: rot.rotate(local_normal),
                distance: t,
            })
        }
    }
}

/// Ray against a circle.
#[must_use]
pub fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<ShapeHit2D> {
    let t = ray_round(
        (origin - center).dot(dir),
        (origin - center).length_squared() - radius * radius,
    )?;
    if t == 0.0 {
        return Some(ShapeHit2D {
            point: origin,
            normal: -dir,
            distance: 0.0,
        });
    }
    let point = origin + dir * t;
    Some(ShapeHit2D {
        point,
        normal: (point - center).normalize_or(-dir),
        distance: t,
    })
}

/// Shared quadratic for circles and spheres, given `b = (o - c)·d` and
/// `c = |o - c|² - r²`. Returns `0` when the origin is inside.
fn ray_round(b: f32, c: f32) -> Option<f32> {
    if c <= 0.0 {
        return Some(0.0);
    }
    if b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    Some((-b - disc.sqrt()).max(0.0))
}

/// Ray against an oriented box of half extents `half`.
#[must_use]
pub fn ray_box_3d(origin: Vec3, dir: Vec3, center: Vec3, rotation: Quat, half: Vec3) -> Option<ShapeHit3D> {
    let inv = rotation.inverse();
    let local_origin = inv * (origin - center);
    let local_dir = inv * dir;

    match slab_test(&local_origin.to_array(), &local_dir.to_array(), &half.to_array())? {
        Slab::Inside => Some(ShapeHit3D {
            point: origin,
            normal: -dir,
            distance: 0.0,
        }),
        Slab::Enter { t, axis, sign } => {
            let mut local_normal = Vec3::ZERO;
            local_normal[axis] = sign;
            Some(ShapeHit3D {
                point: origin + dir * t,
                normal: rotation * local_normal,
                distance: t,
            })
        }
    }
}

/// Ray against a sphere.
#[must_use]
pub fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<ShapeHit3D> {
    let t = ray_round(
        (origin - center).dot(dir),
        (origin - center).length_squared() - radius * radius,
    )?;
    if t == 0.0 {
        return Some(ShapeHit3D {
            point: origin,
            normal: -dir,
            distance: 0.0,
        });
    }
    let point = origin + dir * t;
    Some(ShapeHit3D {
        point,
        normal: (point - center).normalize_or(-dir),
        distance: t,
    })
}

/// Ray against a capsule: the segment `center ± axis * half_segment` swept by
/// `radius`. `axis` must be a unit vector.
#[must_use]
pub fn ray_capsule(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    axis: Vec3,
    half_segment: f32,
    radius: f32,
) -> Option<ShapeHit3D> {
    let closest_on_segment = |p: Vec3| {
        let along = (p - center).dot(axis).clamp(-half_segment, half_segment);
        center + axis * along
    };

    if (origin - closest_on_segment(origin)).length_squared() <= radius * radius {
        return Some(ShapeHit3D {
            point: origin,
            normal: -dir,
            distance: 0.0,
        });
    }

    let mut best: Option<ShapeHit3D> = None;
    let mut consider = |hit: Option<ShapeHit3D>| {
        if let Some(hit) = hit {
            if best.is_none_or(|b| hit.distance < b.distance) {
                best = Some(hit);
            }
        }
    };

    // Cylinder side.
    let oc = origin - center;
    let dir_perp = dir - axis * dir.dot(axis);
    let oc_perp = oc - axis * oc.dot(axis);
    let a = dir_perp.length_squared();
    if a > PARALLEL_EPSILON {
        let b = oc_perp.dot(dir_perp);
        let c = oc_perp.length_squared() - radius * radius;
        let disc = b * b - a * c;
        if disc >= 0.0 {
            let t = (-b - disc.sqrt()) / a;
            if t >= 0.0 {
                let point = origin + dir * t;
                let along = (point - center).dot(axis);
                if along.abs() <= half_segment {
                    consider(Some(ShapeHit3D {
                        point,
                        normal: (point - (center + axis * along)).normalize_or(-dir),
                        distance: t,
                    }));
                }
            }
        }
    }

    // End caps.
    consider(ray_sphere(origin, dir, center + axis * half_segment, radius));
    consider(ray_sphere(origin, dir, center - axis * half_segment, radius));

    best
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_4;

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_box_2d_front_face() {
        let hit = ray_box_2d(Vec2::new(-5.0, 0.0), Vec2::X, Vec2::ZERO, 0.0, Vec2::ONE).unwrap();
        assert!(close(hit.distance, 4.0));
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_box_2d_rotated_corner() {
        // A unit box rotated 45 degrees presents a corner at x = -sqrt(2).
        let hit = ray_box_2d(Vec2::new(-5.0, 0.0), Vec2::X, Vec2::ZERO, FRAC_PI_4, Vec2::ONE).unwrap();
        assert!(close(hit.distance, 5.0 - 2f32.sqrt()));
    }

    #[test]
    fn test_box_2d_miss_and_behind() {
        assert!(ray_box_2d(Vec2::new(-5.0, 3.0), Vec2::X, Vec2::ZERO, 0.0, Vec2::ONE).is_none());
        assert!(ray_box_2d(Vec2::new(5.0, 0.0), Vec2::X, Vec2::ZERO, 0.0, Vec2::ONE).is_none());
    }

    #[test]
    fn test_origin_inside_hits_at_zero() {
        let hit = ray_box_3d(Vec3::ZERO, Vec3::Y, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE).unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, -Vec3::Y);

        let hit = ray_circle(Vec2::new(0.5, 0.0), Vec2::X, Vec2::ZERO, 1.0).unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, -Vec2::X);
    }

    #[test]
    fn test_sphere_hit() {
        let hit = ray_sphere(Vec3::new(0.0, 0.0, -10.0), Vec3::Z, Vec3::ZERO, 2.0).unwrap();
        assert!(close(hit.distance, 8.0));
        assert!((hit.normal - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert!(ray_sphere(Vec3::new(5.0, 0.0, -10.0), Vec3::Z, Vec3::ZERO, 2.0).is_none());
    }

    #[test]
    fn test_capsule_side_and_cap() {
        // Side: ray along +X at y = 0 hits the cylinder wall at x = -1.
        let side = ray_capsule(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, Vec3::ZERO, Vec3::Y, 1.0, 1.0).unwrap();
        assert!(close(side.distance, 4.0));
        assert!((side.normal - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);

        // Cap: ray down the axis hits the top hemisphere at y = 2.
        let cap = ray_capsule(Vec3::new(0.0, 10.0, 0.0), -Vec3::Y, Vec3::ZERO, Vec3::Y, 1.0, 1.0).unwrap();
        assert!(close(cap.distance, 8.0));
        assert!((cap.normal - Vec3::Y).length() < 1e-5);
    }
}
