//! World raycasts against collider kinds.

use hearth_component::{Component, EcsError, EcsResult, Entity, IterationPlan};
use hearth_math::{Collider2D, Collider3D, Transform2D, Transform3D, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::world::World;

/// Nearest 2D hit, or `hit == false` with default fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit2D {
    pub hit: bool,
    pub point: Vec2,
    pub normal: Vec2,
    pub distance: f32,
    pub entity: Entity,
}

impl Default for RaycastHit2D {
    fn default() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            distance: 0.0,
            entity: Entity::NULL,
        }
    }
}

/// Nearest 3D hit, or `hit == false` with default fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit3D {
    pub hit: bool,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub entity: Entity,
}

impl Default for RaycastHit3D {
    fn default() -> Self {
        Self {
            hit: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            distance: 0.0,
            entity: Entity::NULL,
        }
    }
}

/// `f32::INFINITY` asks for an unbounded ray.
fn check_max_distance(max_distance: f32) -> EcsResult<()> {
    if max_distance >= 0.0 {
        Ok(())
    } else {
        Err(EcsError::invalid_argument(format!(
            "ray max distance must be non-negative, got {max_distance}"
        )))
    }
}

fn plan<A: Component, B: Component>() -> IterationPlan {
    IterationPlan {
        required: vec![A::component_type_id(), B::component_type_id()],
        excluded: Vec::new(),
    }
}

impl World {
    /// Cast a ray through every entity with a [`Transform2D`] and a
    /// [`Collider2D`], placing children through their ancestors. Equal
    /// distances go to the lowest slot.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for a non-finite origin, a zero or
    /// non-finite direction, or a negative or NaN max distance.
    pub fn raycast2d(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
    ) -> EcsResult<RaycastHit2D> {
        if !origin.is_finite() || !direction.is_finite() || direction.length_squared() == 0.0 {
            return Err(EcsError::invalid_argument("ray needs a finite origin and a non-zero direction"));
        }
        check_max_distance(max_distance)?;
        let direction = direction.normalize();

        let mut best = RaycastHit2D::default();
        for entity in self.matching(&plan::<Transform2D, Collider2D>()) {
            let (Some(transform), Some(collider)) =
                (self.world_transform2d(entity), self.get::<Collider2D>(entity))
            else {
                continue;
            };
            let Some(hit) = collider.raycast(&transform, origin, direction) else {
                continue;
            };
            if hit.distance <= max_distance && (!best.hit || hit.distance < best.distance) {
                best = RaycastHit2D {
                    hit: true,
                    point: hit.point,
                    normal: hit.normal,
                    distance: hit.distance,
                    entity,
                };
            }
        }
        Ok(best)
    }

    /// Cast a ray through every entity with a [`Transform3D`] and a
    /// [`Collider3D`]. Equal distances go to the lowest slot.
    ///
    /// # Errors
    ///
    /// As [`World::raycast2d`].
    pub fn raycast3d(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> EcsResult<RaycastHit3D> {
        if !origin.is_finite() || !direction.is_finite() || direction.length_squared() == 0.0 {
            return Err(EcsError::invalid_argument("ray needs a finite origin and a non-zero direction"));
        }
        check_max_distance(max_distance)?;
        let direction = direction.normalize();

        let mut best = RaycastHit3D::default();
        for entity in self.matching(&plan::<Transform3D, Collider3D>()) {
            let (Some(transform), Some(collider)) =
                (self.world_transform3d(entity), self.get::<Collider3D>(entity))
            else {
                continue;
            };
            let Some(hit) = collider.raycast(&transform, origin, direction) else {
                continue;
            };
            if hit.distance <= max_distance && (!best.hit || hit.distance < best.distance) {
                best = RaycastHit3D {
                    hit: true,
                    point: hit.point,
                    normal: hit.normal,
                    distance: hit.distance,
                    entity,
                };
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use hearth_component::ErrorCode;
    use hearth_math::Quat;

    use super::*;

    fn box_at(world: &mut World, x: f32) -> Entity {
        let e = world.create_entity().unwrap();
        world.add(e, Transform2D::from_xy(x, 0.0)).unwrap();
        world.add(e, Collider2D::cuboid(1.0, 1.0)).unwrap();
        e
    }

    #[test]
    fn test_nearest_box_wins() {
        let mut world = World::new();
        let _far = box_at(&mut world, 10.0);
        let near = box_at(&mut world, 5.0);
        let hit = world.raycast2d(Vec2::ZERO, Vec2::new(3.0, 0.0), 100.0).unwrap();
        assert!(hit.hit);
        assert_eq!(hit.entity, near);
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_out_of_range_is_a_miss() {
        let mut world = World::new();
        box_at(&mut world, 5.0);
        let hit = world.raycast2d(Vec2::ZERO, Vec2::X, 2.0).unwrap();
        assert_eq!(hit, RaycastHit2D::default());
    }

    #[test]
    fn test_invalid_rays_rejected() {
        let world = World::new();
        for (dir, max) in [
            (Vec2::ZERO, 1.0),
            (Vec2::new(f32::NAN, 0.0), 1.0),
            (Vec2::X, -1.0),
            (Vec2::X, f32::NAN),
            (Vec2::X, f32::NEG_INFINITY),
        ] {
            let err = world.raycast2d(Vec2::ZERO, dir, max).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }
    }

    #[test]
    fn test_infinite_max_distance_is_unbounded() {
        let mut world = World::new();
        let far = box_at(&mut world, 1.0e6);
        let hit = world.raycast2d(Vec2::ZERO, Vec2::X, f32::INFINITY).unwrap();
        assert_eq!(hit.entity, far);

        let e = world.create_entity().unwrap();
        world.add(e, Transform3D::from_position(Vec3::new(0.0, 0.0, 500.0))).unwrap();
        world.add(e, Collider3D::sphere(1.0)).unwrap();
        let hit = world.raycast3d(Vec3::ZERO, Vec3::Z, f32::INFINITY).unwrap();
        assert_eq!(hit.entity, e);
        assert!((hit.distance - 499.0).abs() < 1e-3);
    }

    #[test]
    fn test_child_collider_is_placed_through_parent() {
        let mut world = World::new();
        let parent = world.create_entity().unwrap();
        world.add(parent, Transform2D::from_xy(10.0, 0.0)).unwrap();
        let child = box_at(&mut world, 5.0);
        world.set_parent(child, parent).unwrap();

        let hit = world.raycast2d(Vec2::ZERO, Vec2::X, 100.0).unwrap();
        assert_eq!(hit.entity, child);
        assert!((hit.distance - 14.5).abs() < 1e-4);
    }

    #[test]
    fn test_equal_distance_3d_goes_to_lowest_slot() {
        let mut world = World::new();
        let first = world.create_entity().unwrap();
        let second = world.create_entity().unwrap();
        // Added out of slot order so storage order differs from slot order.
        for e in [second, first] {
            world.add(e, Transform3D::from_position(Vec3::new(0.0, 0.0, 5.0))).unwrap();
            world.add(e, Collider3D::sphere(1.0)).unwrap();
        }
        let hit = world.raycast3d(Vec3::ZERO, Vec3::Z, 100.0).unwrap();
        assert!(hit.hit);
        assert_eq!(hit.entity, first);
        assert!((hit.distance - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_inside_start_hits_at_zero() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add(e, Transform3D::default()).unwrap();
        world.add(e, Collider3D::sphere(1.0)).unwrap();
        let hit = world.raycast3d(Vec3::ZERO, Vec3::Z, 10.0).unwrap();
        assert_eq!(hit.entity, e);
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, -Vec3::Z);
    }

    #[test]
    fn test_rotated_box_3d() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        world
            .add(e, Transform3D::from_position_rotation(Vec3::new(0.0, 0.0, 5.0), rotation))
            .unwrap();
        world.add(e, Collider3D::cuboid(Vec3::ONE)).unwrap();
        let hit = world.raycast3d(Vec3::ZERO, Vec3::Z, 10.0).unwrap();
        assert!(hit.hit);
        let corner = 5.0 - std::f32::consts::SQRT_2 * 0.5;
        assert!((hit.distance - corner).abs() < 1e-4);
    }
}
