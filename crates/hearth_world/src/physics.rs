//! The physics phase: semi-implicit Euler over rigid bodies.
//!
//! Dynamic bodies:
//!
//! ```text
//! v += (force / mass + gravity * gravity_scale) * dt + impulse / mass
//! v *= max(1 - linear_damping * dt, 0)
//! x += v * dt
//! ```
//!
//! Angular terms use the same scheme with mass standing in for inertia.
//! Kinematic bodies move by their velocity; static bodies never move.

use hearth_component::{EcsError, EcsResult, Entity};
use hearth_math::{
    BodyType, Quat, RigidBody2D, RigidBody3D, Transform2D, Transform3D, Vec2, Vec3, Velocity2D,
    Velocity3D,
};

use crate::pipeline::{FrameReport, Phase, PhasePlans, run_guarded};
use crate::world::World;

/// The physics phase.
pub(crate) fn run(world: &mut World, plans: &PhasePlans, dt: f32, report: &mut FrameReport) {
    let gravity = world.config.physics;
    if let Some(plan) = &plans.bodies_2d {
        for entity in world.matching(plan) {
            run_guarded(world, Phase::Physics, entity, report, |w| {
                step_body_2d(w, entity, dt, gravity.gravity_2d)
            });
        }
    }
    if let Some(plan) = &plans.bodies_3d {
        for entity in world.matching(plan) {
            run_guarded(world, Phase::Physics, entity, report, |w| {
                step_body_3d(w, entity, dt, gravity.gravity_3d)
            });
        }
    }
}

fn inverse_mass(entity: Entity, mass: f32) -> EcsResult<f32> {
    if mass.is_finite() && mass > 0.0 {
        Ok(mass.recip())
    } else {
        Err(EcsError::failed(format!(
            "dynamic body {entity} has invalid mass {mass}"
        )))
    }
}

fn damping(coefficient: f32, dt: f32) -> f32 {
    (1.0 - coefficient * dt).max(0.0)
}

fn step_body_2d(world: &mut World, entity: Entity, dt: f32, gravity: Vec2) -> EcsResult<()> {
    let Some(body) = world.get_mut::<RigidBody2D>(entity) else {
        return Ok(());
    };
    let accumulated = *body;
    body.clear_accumulators();

    if !world.has::<Velocity2D>(entity) {
        world.add(entity, Velocity2D::ZERO)?;
    }
    let mut velocity = world.get::<Velocity2D>(entity).copied().unwrap_or_default();

    match accumulated.body_type {
        BodyType::Static => return Ok(()),
        BodyType::Kinematic => {}
        BodyType::Dynamic => {
            let inv_mass = inverse_mass(entity, accumulated.mass)?;
            velocity.linear += (accumulated.force * inv_mass
                + gravity * accumulated.gravity_scale)
                * dt
                + accumulated.impulse * inv_mass;
            velocity.linear *= damping(accumulated.linear_damping, dt);
            velocity.angular += accumulated.torque * inv_mass * dt;
            velocity.angular *= damping(accumulated.angular_damping, dt);
            world.set(entity, velocity)?;
        }
    }

    if let Some(transform) = world.get_mut::<Transform2D>(entity) {
        transform.position += velocity.linear * dt;
        transform.rotation += velocity.angular * dt;
    }
    Ok(())
}

fn step_body_3d(world: &mut World, entity: Entity, dt: f32, gravity: Vec3) -> EcsResult<()> {
    let Some(body) = world.get_mut::<RigidBody3D>(entity) else {
        return Ok(());
    };
    let accumulated = *body;
    body.clear_accumulators();

    if !world.has::<Velocity3D>(entity) {
        world.add(entity, Velocity3D::ZERO)?;
    }
    let mut velocity = world.get::<Velocity3D>(entity).copied().unwrap_or_default();

    match accumulated.body_type {
        BodyType::Static => return Ok(()),
        BodyType::Kinematic => {}
        BodyType::Dynamic => {
            let inv_mass = inverse_mass(entity, accumulated.mass)?;
            velocity.linear += (accumulated.force * inv_mass
                + gravity * accumulated.gravity_scale)
                * dt
                + accumulated.impulse * inv_mass;
            velocity.linear *= damping(accumulated.linear_damping, dt);
            velocity.angular += accumulated.torque * inv_mass * dt;
            velocity.angular *= damping(accumulated.angular_damping, dt);
            world.set(entity, velocity)?;
        }
    }

    if let Some(transform) = world.get_mut::<Transform3D>(entity) {
        transform.position += velocity.linear * dt;
        let spin = Quat::from_scaled_axis(velocity.angular * dt);
        transform.rotation = (spin * transform.rotation).normalize();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_2d(world: &mut World, body: RigidBody2D) -> Entity {
        let e = world.create_entity().unwrap();
        world.add(e, Transform2D::IDENTITY).unwrap();
        world.add(e, body).unwrap();
        e
    }

    #[test]
    fn test_gravity_pulls_dynamic_body() {
        let mut world = World::new();
        let e = body_2d(&mut world, RigidBody2D::dynamic(2.0));
        step_body_2d(&mut world, e, 0.5, Vec2::new(0.0, -10.0)).unwrap();
        assert_eq!(world.get::<Velocity2D>(e).map(|v| v.linear), Some(Vec2::new(0.0, -5.0)));
        assert_eq!(world.get::<Transform2D>(e).map(|t| t.position), Some(Vec2::new(0.0, -2.5)));
    }

    #[test]
    fn test_impulse_is_applied_once() {
        let mut world = World::new();
        let mut body = RigidBody2D::dynamic(2.0).with_gravity_scale(0.0);
        body.apply_impulse(Vec2::new(4.0, 0.0));
        let e = body_2d(&mut world, body);

        step_body_2d(&mut world, e, 0.1, Vec2::ZERO).unwrap();
        step_body_2d(&mut world, e, 0.1, Vec2::ZERO).unwrap();
        assert_eq!(world.get::<Velocity2D>(e).map(|v| v.linear), Some(Vec2::new(2.0, 0.0)));
        assert_eq!(world.get::<RigidBody2D>(e).map(|b| b.impulse), Some(Vec2::ZERO));
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = World::new();
        let mut body = RigidBody2D::fixed();
        body.apply_force(Vec2::new(100.0, 0.0));
        let e = body_2d(&mut world, body);
        world.add(e, Velocity2D::new(5.0, 5.0)).unwrap();

        step_body_2d(&mut world, e, 0.1, Vec2::new(0.0, -9.81)).unwrap();
        assert_eq!(world.get::<Transform2D>(e).map(|t| t.position), Some(Vec2::ZERO));
        assert_eq!(world.get::<RigidBody2D>(e).map(|b| b.force), Some(Vec2::ZERO));
    }

    #[test]
    fn test_kinematic_ignores_gravity() {
        let mut world = World::new();
        let e = body_2d(&mut world, RigidBody2D::kinematic());
        world.add(e, Velocity2D::new(1.0, 0.0)).unwrap();
        step_body_2d(&mut world, e, 0.5, Vec2::new(0.0, -9.81)).unwrap();
        assert_eq!(world.get::<Transform2D>(e).map(|t| t.position), Some(Vec2::new(0.5, 0.0)));
    }

    #[test]
    fn test_invalid_mass_still_clears_accumulators() {
        let mut world = World::new();
        let mut body = RigidBody2D::dynamic(f32::NAN);
        body.apply_force(Vec2::X);
        let e = body_2d(&mut world, body);
        assert!(step_body_2d(&mut world, e, 0.1, Vec2::ZERO).is_err());
        assert_eq!(world.get::<RigidBody2D>(e).map(|b| b.force), Some(Vec2::ZERO));
    }

    #[test]
    fn test_3d_spin_keeps_rotation_normalized() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.add(e, Transform3D::default()).unwrap();
        world.add(e, RigidBody3D::kinematic()).unwrap();
        world
            .add(
                e,
                Velocity3D {
                    linear: Vec3::X,
                    angular: Vec3::new(0.0, 3.0, 0.0),
                },
            )
            .unwrap();
        for _ in 0..20 {
            step_body_3d(&mut world, e, 0.05, Vec3::ZERO).unwrap();
        }
        let transform = world.get::<Transform3D>(e).unwrap();
        assert!((transform.rotation.length() - 1.0).abs() < 1e-5);
        assert!((transform.position.x - 1.0).abs() < 1e-5);
    }
}
