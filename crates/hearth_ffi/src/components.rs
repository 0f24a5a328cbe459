//! Transforms, velocities, rigid bodies and colliders.
//!
//! `add` attaches or replaces a component, `set` replaces an existing one
//! and fails with `InvalidHandle` when it is missing, `get` copies it out.

use hearth_component::{Component, EcsError, EcsResult, Entity, ErrorCode};
use hearth_math::{
    BodyType, Collider2D, Collider3D, Quat, RigidBody2D, RigidBody3D, Transform2D, Transform3D,
    Vec3, Velocity2D, Velocity3D,
};
use hearth_world::World;

use crate::error::{FfiResult, out_param, status};
use crate::handle::{WorldHandle, with_world};
use crate::raycast::{HearthVec2, HearthVec3};

/// `body_type` value for a body moved by forces, impulses and gravity.
pub const HEARTH_BODY_DYNAMIC: u32 = 0;
/// `body_type` value for a body that never moves.
pub const HEARTH_BODY_STATIC: u32 = 1;
/// `body_type` value for a body moved by its velocity only.
pub const HEARTH_BODY_KINEMATIC: u32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthQuat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<Quat> for HearthQuat {
    fn from(q: Quat) -> Self {
        Self {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }
}

impl From<HearthQuat> for Quat {
    fn from(q: HearthQuat) -> Self {
        Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

/// Rotation in radians.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthTransform2D {
    pub position: HearthVec2,
    pub rotation: f32,
    pub scale: HearthVec2,
}

impl From<Transform2D> for HearthTransform2D {
    fn from(t: Transform2D) -> Self {
        Self {
            position: t.position.into(),
            rotation: t.rotation,
            scale: t.scale.into(),
        }
    }
}

impl From<HearthTransform2D> for Transform2D {
    fn from(t: HearthTransform2D) -> Self {
        Self {
            position: t.position.into(),
            rotation: t.rotation,
            scale: t.scale.into(),
        }
    }
}

/// The rotation is normalized on the way in.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthTransform3D {
    pub position: HearthVec3,
    pub rotation: HearthQuat,
    pub scale: HearthVec3,
}

impl From<Transform3D> for HearthTransform3D {
    fn from(t: Transform3D) -> Self {
        Self {
            position: t.position.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl From<HearthTransform3D> for Transform3D {
    fn from(t: HearthTransform3D) -> Self {
        Self {
            position: t.position.into(),
            rotation: Quat::from(t.rotation).normalize(),
            scale: t.scale.into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthVelocity2D {
    pub linear: HearthVec2,
    pub angular: f32,
}

impl From<Velocity2D> for HearthVelocity2D {
    fn from(v: Velocity2D) -> Self {
        Self {
            linear: v.linear.into(),
            angular: v.angular,
        }
    }
}

impl From<HearthVelocity2D> for Velocity2D {
    fn from(v: HearthVelocity2D) -> Self {
        Self {
            linear: v.linear.into(),
            angular: v.angular,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthVelocity3D {
    pub linear: HearthVec3,
    pub angular: HearthVec3,
}

impl From<Velocity3D> for HearthVelocity3D {
    fn from(v: Velocity3D) -> Self {
        Self {
            linear: v.linear.into(),
            angular: v.angular.into(),
        }
    }
}

impl From<HearthVelocity3D> for Velocity3D {
    fn from(v: HearthVelocity3D) -> Self {
        Self {
            linear: v.linear.into(),
            angular: v.angular.into(),
        }
    }
}

/// Body settings shared by both dimensions. Accumulated forces and
/// impulses are not part of it; they only enter through the apply calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthRigidBody {
    /// One of the `HEARTH_BODY_*` constants.
    pub body_type: u32,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
}

impl HearthRigidBody {
    fn body_type(&self) -> EcsResult<BodyType> {
        match self.body_type {
            HEARTH_BODY_DYNAMIC => Ok(BodyType::Dynamic),
            HEARTH_BODY_STATIC => Ok(BodyType::Static),
            HEARTH_BODY_KINEMATIC => Ok(BodyType::Kinematic),
            other => Err(EcsError::invalid_argument(format!("unknown body type {other}"))),
        }
    }

    fn checked(&self) -> EcsResult<BodyType> {
        let body_type = self.body_type()?;
        let finite = [self.mass, self.linear_damping, self.angular_damping, self.gravity_scale]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(EcsError::invalid_argument("rigid body settings must be finite"));
        }
        if body_type == BodyType::Dynamic && self.mass <= 0.0 {
            return Err(EcsError::invalid_argument("dynamic bodies need a positive mass"));
        }
        if self.linear_damping < 0.0 || self.angular_damping < 0.0 {
            return Err(EcsError::invalid_argument("damping must not be negative"));
        }
        Ok(body_type)
    }
}

fn body_code(body_type: BodyType) -> u32 {
    match body_type {
        BodyType::Dynamic => HEARTH_BODY_DYNAMIC,
        BodyType::Static => HEARTH_BODY_STATIC,
        BodyType::Kinematic => HEARTH_BODY_KINEMATIC,
    }
}

impl From<RigidBody2D> for HearthRigidBody {
    fn from(body: RigidBody2D) -> Self {
        Self {
            body_type: body_code(body.body_type),
            mass: body.mass,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            gravity_scale: body.gravity_scale,
        }
    }
}

impl From<RigidBody3D> for HearthRigidBody {
    fn from(body: RigidBody3D) -> Self {
        Self {
            body_type: body_code(body.body_type),
            mass: body.mass,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            gravity_scale: body.gravity_scale,
        }
    }
}

impl HearthRigidBody {
    /// Apply these settings to `body`, keeping its accumulators.
    fn apply_2d(&self, mut body: RigidBody2D) -> EcsResult<RigidBody2D> {
        body.body_type = self.checked()?;
        body.mass = self.mass;
        body.linear_damping = self.linear_damping;
        body.angular_damping = self.angular_damping;
        body.gravity_scale = self.gravity_scale;
        Ok(body)
    }

    fn apply_3d(&self, mut body: RigidBody3D) -> EcsResult<RigidBody3D> {
        body.body_type = self.checked()?;
        body.mass = self.mass;
        body.linear_damping = self.linear_damping;
        body.angular_damping = self.angular_damping;
        body.gravity_scale = self.gravity_scale;
        Ok(body)
    }
}

fn read<T: Component>(world: &World, entity: Entity) -> EcsResult<T> {
    if !world.is_alive(entity) {
        return Err(EcsError::InvalidHandle(entity));
    }
    world
        .get::<T>(entity)
        .cloned()
        .ok_or(EcsError::MissingComponent {
            entity,
            component: T::type_name(),
        })
}

fn update<T: Component>(
    world: &mut World,
    entity: Entity,
    change: impl FnOnce(T) -> EcsResult<T>,
) -> EcsResult<()> {
    let value = change(read::<T>(world, entity)?)?;
    world.set(entity, value)
}

fn add<T: Component>(world: WorldHandle, entity: u64, value: impl FnOnce() -> EcsResult<T>) -> ErrorCode {
    status(with_world(world, |w| {
        w.add(Entity::from_bits(entity), value()?)?;
        Ok(())
    }))
}

fn set<T: Component>(world: WorldHandle, entity: u64, value: T) -> ErrorCode {
    status(with_world(world, |w| {
        w.set(Entity::from_bits(entity), value)?;
        Ok(())
    }))
}

/// # Safety
///
/// `out` must be null or valid for a write.
unsafe fn get<T: Component, C: From<T>>(
    world: WorldHandle,
    entity: u64,
    out: *mut C,
    what: &str,
) -> ErrorCode {
    let result: FfiResult<()> = out_param(out, what).and_then(|out| {
        with_world(world, |w| {
            let value = read::<T>(w, Entity::from_bits(entity))?;
            unsafe { out.write(value.into()) };
            Ok(())
        })
    });
    status(result)
}

// ── Transforms ──────────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_transform2d(
    world: WorldHandle,
    entity: u64,
    transform: HearthTransform2D,
) -> ErrorCode {
    add(world, entity, || Ok(Transform2D::from(transform)))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_transform2d(
    world: WorldHandle,
    entity: u64,
    transform: HearthTransform2D,
) -> ErrorCode {
    set(world, entity, Transform2D::from(transform))
}

/// # Safety
///
/// `out_transform` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_get_transform2d(
    world: WorldHandle,
    entity: u64,
    out_transform: *mut HearthTransform2D,
) -> ErrorCode {
    unsafe { get::<Transform2D, _>(world, entity, out_transform, "out_transform") }
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_transform3d(
    world: WorldHandle,
    entity: u64,
    transform: HearthTransform3D,
) -> ErrorCode {
    add(world, entity, || Ok(Transform3D::from(transform)))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_transform3d(
    world: WorldHandle,
    entity: u64,
    transform: HearthTransform3D,
) -> ErrorCode {
    set(world, entity, Transform3D::from(transform))
}

/// # Safety
///
/// `out_transform` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_get_transform3d(
    world: WorldHandle,
    entity: u64,
    out_transform: *mut HearthTransform3D,
) -> ErrorCode {
    unsafe { get::<Transform3D, _>(world, entity, out_transform, "out_transform") }
}

// ── Velocities ──────────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_velocity2d(
    world: WorldHandle,
    entity: u64,
    velocity: HearthVelocity2D,
) -> ErrorCode {
    add(world, entity, || Ok(Velocity2D::from(velocity)))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_velocity2d(
    world: WorldHandle,
    entity: u64,
    velocity: HearthVelocity2D,
) -> ErrorCode {
    set(world, entity, Velocity2D::from(velocity))
}

/// # Safety
///
/// `out_velocity` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_get_velocity2d(
    world: WorldHandle,
    entity: u64,
    out_velocity: *mut HearthVelocity2D,
) -> ErrorCode {
    unsafe { get::<Velocity2D, _>(world, entity, out_velocity, "out_velocity") }
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_velocity3d(
    world: WorldHandle,
    entity: u64,
    velocity: HearthVelocity3D,
) -> ErrorCode {
    add(world, entity, || Ok(Velocity3D::from(velocity)))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_velocity3d(
    world: WorldHandle,
    entity: u64,
    velocity: HearthVelocity3D,
) -> ErrorCode {
    set(world, entity, Velocity3D::from(velocity))
}

/// # Safety
///
/// `out_velocity` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_get_velocity3d(
    world: WorldHandle,
    entity: u64,
    out_velocity: *mut HearthVelocity3D,
) -> ErrorCode {
    unsafe { get::<Velocity3D, _>(world, entity, out_velocity, "out_velocity") }
}

// ── Rigid bodies ────────────────────────────────────────────────────────────

/// Attach a 2D body with no accumulated forces.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_rigidbody2d(
    world: WorldHandle,
    entity: u64,
    body: HearthRigidBody,
) -> ErrorCode {
    add(world, entity, || body.apply_2d(RigidBody2D::fixed()))
}

/// Change a 2D body's settings. Forces and impulses already applied this
/// frame are kept.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_rigidbody2d(
    world: WorldHandle,
    entity: u64,
    body: HearthRigidBody,
) -> ErrorCode {
    status(with_world(world, |w| {
        update::<RigidBody2D>(w, Entity::from_bits(entity), |current| body.apply_2d(current))?;
        Ok(())
    }))
}

/// # Safety
///
/// `out_body` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_get_rigidbody2d(
    world: WorldHandle,
    entity: u64,
    out_body: *mut HearthRigidBody,
) -> ErrorCode {
    unsafe { get::<RigidBody2D, _>(world, entity, out_body, "out_body") }
}

/// Attach a 3D body with no accumulated forces.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_rigidbody3d(
    world: WorldHandle,
    entity: u64,
    body: HearthRigidBody,
) -> ErrorCode {
    add(world, entity, || body.apply_3d(RigidBody3D::fixed()))
}

/// Change a 3D body's settings. Forces and impulses already applied this
/// frame are kept.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_set_rigidbody3d(
    world: WorldHandle,
    entity: u64,
    body: HearthRigidBody,
) -> ErrorCode {
    status(with_world(world, |w| {
        update::<RigidBody3D>(w, Entity::from_bits(entity), |current| body.apply_3d(current))?;
        Ok(())
    }))
}

/// # Safety
///
/// `out_body` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_get_rigidbody3d(
    world: WorldHandle,
    entity: u64,
    out_body: *mut HearthRigidBody,
) -> ErrorCode {
    unsafe { get::<RigidBody3D, _>(world, entity, out_body, "out_body") }
}

fn finite2(v: HearthVec2) -> EcsResult<HearthVec2> {
    if v.x.is_finite() && v.y.is_finite() {
        Ok(v)
    } else {
        Err(EcsError::invalid_argument("vector components must be finite"))
    }
}

fn finite3(v: HearthVec3) -> EcsResult<HearthVec3> {
    if Vec3::from(v).is_finite() {
        Ok(v)
    } else {
        Err(EcsError::invalid_argument("vector components must be finite"))
    }
}

/// Accumulate a force on a 2D body until the next update.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_rigidbody2d_apply_force(
    world: WorldHandle,
    entity: u64,
    force: HearthVec2,
) -> ErrorCode {
    status(with_world(world, |w| {
        let force = finite2(force)?;
        update::<RigidBody2D>(w, Entity::from_bits(entity), |mut body| {
            body.apply_force(force.into());
            Ok(body)
        })?;
        Ok(())
    }))
}

/// Queue an instantaneous velocity change on a 2D body.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_rigidbody2d_apply_impulse(
    world: WorldHandle,
    entity: u64,
    impulse: HearthVec2,
) -> ErrorCode {
    status(with_world(world, |w| {
        let impulse = finite2(impulse)?;
        update::<RigidBody2D>(w, Entity::from_bits(entity), |mut body| {
            body.apply_impulse(impulse.into());
            Ok(body)
        })?;
        Ok(())
    }))
}

/// Accumulate a force on a 3D body until the next update.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_rigidbody3d_apply_force(
    world: WorldHandle,
    entity: u64,
    force: HearthVec3,
) -> ErrorCode {
    status(with_world(world, |w| {
        let force = finite3(force)?;
        update::<RigidBody3D>(w, Entity::from_bits(entity), |mut body| {
            body.apply_force(force.into());
            Ok(body)
        })?;
        Ok(())
    }))
}

/// Queue an instantaneous velocity change on a 3D body.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_rigidbody3d_apply_impulse(
    world: WorldHandle,
    entity: u64,
    impulse: HearthVec3,
) -> ErrorCode {
    status(with_world(world, |w| {
        let impulse = finite3(impulse)?;
        update::<RigidBody3D>(w, Entity::from_bits(entity), |mut body| {
            body.apply_impulse(impulse.into());
            Ok(body)
        })?;
        Ok(())
    }))
}

// ── Colliders ───────────────────────────────────────────────────────────────

fn collider2d(shape: Collider2D) -> EcsResult<Collider2D> {
    shape.validate()?;
    Ok(shape)
}

fn collider3d(shape: Collider3D) -> EcsResult<Collider3D> {
    shape.validate()?;
    Ok(shape)
}

/// Attach a box of full extents `width` by `height`, centred on the entity.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_box_collider2d(
    world: WorldHandle,
    entity: u64,
    width: f32,
    height: f32,
) -> ErrorCode {
    add(world, entity, || collider2d(Collider2D::cuboid(width, height)))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_circle_collider(world: WorldHandle, entity: u64, radius: f32) -> ErrorCode {
    add(world, entity, || collider2d(Collider2D::circle(radius)))
}

/// Attach a box of full extents `size`, centred on the entity.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_box_collider3d(
    world: WorldHandle,
    entity: u64,
    size: HearthVec3,
) -> ErrorCode {
    add(world, entity, || collider3d(Collider3D::cuboid(size.into())))
}

#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_sphere_collider(world: WorldHandle, entity: u64, radius: f32) -> ErrorCode {
    add(world, entity, || collider3d(Collider3D::sphere(radius)))
}

/// Attach a capsule along the local Y axis. `height` is the distance
/// between the hemisphere centres and may be zero.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_add_capsule_collider(
    world: WorldHandle,
    entity: u64,
    radius: f32,
    height: f32,
) -> ErrorCode {
    add(world, entity, || collider3d(Collider3D::capsule(radius, height)))
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use hearth_math::Vec2;

    use super::*;
    use crate::raycast::{HearthRaycastHit2D, HearthRaycastHit3D, hearth_raycast2d, hearth_raycast3d};
    use crate::world::{
        hearth_entity_create, hearth_entity_destroy, hearth_world_create, hearth_world_destroy,
        hearth_world_update,
    };

    fn spawn(world: WorldHandle) -> u64 {
        let mut e = 0u64;
        assert_eq!(unsafe { hearth_entity_create(world, &mut e) }, ErrorCode::Ok);
        e
    }

    fn body(body_type: u32, mass: f32) -> HearthRigidBody {
        HearthRigidBody {
            body_type,
            mass,
            gravity_scale: 1.0,
            ..HearthRigidBody::default()
        }
    }

    fn at(x: f32, y: f32) -> HearthTransform2D {
        Transform2D::from_xy(x, y).into()
    }

    #[test]
    fn test_transform_add_get_set() {
        let world = hearth_world_create();
        let e = spawn(world);

        let mut out = HearthTransform2D::default();
        assert_eq!(unsafe { hearth_get_transform2d(world, e, &mut out) }, ErrorCode::InvalidHandle);
        assert_eq!(hearth_set_transform2d(world, e, at(1.0, 2.0)), ErrorCode::InvalidHandle);

        assert_eq!(hearth_add_transform2d(world, e, at(1.0, 2.0)), ErrorCode::Ok);
        assert_eq!(hearth_set_transform2d(world, e, at(3.0, 4.0)), ErrorCode::Ok);
        assert_eq!(unsafe { hearth_get_transform2d(world, e, &mut out) }, ErrorCode::Ok);
        assert_eq!(out, at(3.0, 4.0));
        assert_eq!(out.scale, HearthVec2 { x: 1.0, y: 1.0 });

        let code = unsafe { hearth_get_transform2d(world, e, ptr::null_mut()) };
        assert_eq!(code, ErrorCode::NullPointer);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_transform3d_rotation_is_normalized() {
        let world = hearth_world_create();
        let e = spawn(world);
        let skewed = HearthTransform3D {
            rotation: HearthQuat { x: 0.0, y: 0.0, z: 0.0, w: 2.0 },
            scale: HearthVec3 { x: 1.0, y: 1.0, z: 1.0 },
            ..HearthTransform3D::default()
        };
        assert_eq!(hearth_add_transform3d(world, e, skewed), ErrorCode::Ok);
        let mut out = HearthTransform3D::default();
        assert_eq!(unsafe { hearth_get_transform3d(world, e, &mut out) }, ErrorCode::Ok);
        assert_eq!(out.rotation, HearthQuat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 });
        hearth_world_destroy(world);
    }

    #[test]
    fn test_dead_entity_is_invalid_handle() {
        let world = hearth_world_create();
        let e = spawn(world);
        assert_eq!(hearth_entity_destroy(world, e), ErrorCode::Ok);
        assert_eq!(hearth_add_transform2d(world, e, at(0.0, 0.0)), ErrorCode::InvalidHandle);
        assert_eq!(hearth_add_circle_collider(world, e, 1.0), ErrorCode::InvalidHandle);
        let push = HearthVec2 { x: 1.0, y: 0.0 };
        assert_eq!(hearth_rigidbody2d_apply_force(world, e, push), ErrorCode::InvalidHandle);
        let mut out = HearthVelocity2D::default();
        assert_eq!(unsafe { hearth_get_velocity2d(world, e, &mut out) }, ErrorCode::InvalidHandle);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_kinematic_body_moves_by_velocity() {
        let world = hearth_world_create();
        let e = spawn(world);
        assert_eq!(hearth_add_transform2d(world, e, at(0.0, 0.0)), ErrorCode::Ok);
        assert_eq!(hearth_add_rigidbody2d(world, e, body(HEARTH_BODY_KINEMATIC, 1.0)), ErrorCode::Ok);
        let velocity = HearthVelocity2D {
            linear: HearthVec2 { x: 2.0, y: 0.0 },
            angular: 0.0,
        };
        assert_eq!(hearth_add_velocity2d(world, e, velocity), ErrorCode::Ok);
        assert_eq!(hearth_world_update(world, 0.2), ErrorCode::Ok);

        let mut out = HearthTransform2D::default();
        unsafe { hearth_get_transform2d(world, e, &mut out) };
        assert!((out.position.x - 0.4).abs() < 1e-5);
        assert_eq!(out.position.y, 0.0);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_impulse_and_force_reach_velocity() {
        let world = hearth_world_create();
        let e = spawn(world);
        hearth_add_transform2d(world, e, at(0.0, 0.0));
        let weightless = HearthRigidBody {
            gravity_scale: 0.0,
            ..body(HEARTH_BODY_DYNAMIC, 2.0)
        };
        assert_eq!(hearth_add_rigidbody2d(world, e, weightless), ErrorCode::Ok);

        let impulse = HearthVec2 { x: 4.0, y: 0.0 };
        assert_eq!(hearth_rigidbody2d_apply_impulse(world, e, impulse), ErrorCode::Ok);
        let force = HearthVec2 { x: 0.0, y: 8.0 };
        assert_eq!(hearth_rigidbody2d_apply_force(world, e, force), ErrorCode::Ok);
        assert_eq!(hearth_world_update(world, 0.2), ErrorCode::Ok);

        let mut velocity = HearthVelocity2D::default();
        assert_eq!(unsafe { hearth_get_velocity2d(world, e, &mut velocity) }, ErrorCode::Ok);
        assert!((Vec2::from(velocity.linear) - Vec2::new(2.0, 0.8)).length() < 1e-5);

        // Accumulators are cleared by the update.
        assert_eq!(hearth_world_update(world, 0.2), ErrorCode::Ok);
        unsafe { hearth_get_velocity2d(world, e, &mut velocity) };
        assert!((Vec2::from(velocity.linear) - Vec2::new(2.0, 0.8)).length() < 1e-5);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_force_without_body_is_invalid_handle() {
        let world = hearth_world_create();
        let e = spawn(world);
        let push = HearthVec3 { x: 1.0, y: 0.0, z: 0.0 };
        assert_eq!(hearth_rigidbody3d_apply_force(world, e, push), ErrorCode::InvalidHandle);
        assert_eq!(hearth_rigidbody3d_apply_impulse(world, e, push), ErrorCode::InvalidHandle);

        assert_eq!(hearth_add_rigidbody3d(world, e, body(HEARTH_BODY_DYNAMIC, 1.0)), ErrorCode::Ok);
        let bad = HearthVec3 { x: f32::NAN, y: 0.0, z: 0.0 };
        assert_eq!(hearth_rigidbody3d_apply_force(world, e, bad), ErrorCode::InvalidArgument);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_rigidbody_settings_are_checked() {
        let world = hearth_world_create();
        let e = spawn(world);
        assert_eq!(hearth_add_rigidbody2d(world, e, body(7, 1.0)), ErrorCode::InvalidArgument);
        assert_eq!(
            hearth_add_rigidbody2d(world, e, body(HEARTH_BODY_DYNAMIC, 0.0)),
            ErrorCode::InvalidArgument
        );
        assert_eq!(hearth_add_rigidbody2d(world, e, body(HEARTH_BODY_STATIC, 0.0)), ErrorCode::Ok);

        let heavy = body(HEARTH_BODY_DYNAMIC, 5.0);
        assert_eq!(hearth_set_rigidbody2d(world, e, heavy), ErrorCode::Ok);
        let mut out = HearthRigidBody::default();
        assert_eq!(unsafe { hearth_get_rigidbody2d(world, e, &mut out) }, ErrorCode::Ok);
        assert_eq!(out, heavy);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_colliders_are_hit_by_rays() {
        let world = hearth_world_create();
        let crate_box = spawn(world);
        hearth_add_transform2d(world, crate_box, at(5.0, 0.0));
        assert_eq!(hearth_add_box_collider2d(world, crate_box, 2.0, 2.0), ErrorCode::Ok);

        let mut hit = HearthRaycastHit2D::default();
        let right = HearthVec2 { x: 1.0, y: 0.0 };
        let code = unsafe { hearth_raycast2d(world, HearthVec2::default(), right, f32::INFINITY, &mut hit) };
        assert_eq!(code, ErrorCode::Ok);
        assert_eq!(hit.entity, crate_box);
        assert!((hit.distance - 4.0).abs() < 1e-5);

        let pill = spawn(world);
        let above = HearthTransform3D {
            position: HearthVec3 { x: 0.0, y: 10.0, z: 0.0 },
            rotation: HearthQuat { w: 1.0, ..HearthQuat::default() },
            scale: HearthVec3 { x: 1.0, y: 1.0, z: 1.0 },
        };
        hearth_add_transform3d(world, pill, above);
        assert_eq!(hearth_add_capsule_collider(world, pill, 0.5, 2.0), ErrorCode::Ok);

        let mut hit = HearthRaycastHit3D::default();
        let up = HearthVec3 { x: 0.0, y: 1.0, z: 0.0 };
        let code = unsafe { hearth_raycast3d(world, HearthVec3::default(), up, 100.0, &mut hit) };
        assert_eq!(code, ErrorCode::Ok);
        assert_eq!(hit.entity, pill);
        assert!((hit.distance - 8.5).abs() < 1e-4);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_degenerate_colliders_are_rejected() {
        let world = hearth_world_create();
        let e = spawn(world);
        assert_eq!(hearth_add_circle_collider(world, e, 0.0), ErrorCode::InvalidArgument);
        assert_eq!(hearth_add_box_collider2d(world, e, 1.0, f32::NAN), ErrorCode::InvalidArgument);
        assert_eq!(hearth_add_sphere_collider(world, e, -1.0), ErrorCode::InvalidArgument);
        let flat = HearthVec3 { x: 1.0, y: 0.0, z: 1.0 };
        assert_eq!(hearth_add_box_collider3d(world, e, flat), ErrorCode::InvalidArgument);
        assert_eq!(hearth_add_capsule_collider(world, e, 1.0, 0.0), ErrorCode::Ok);
        assert_eq!(hearth_add_sphere_collider(world, e, 1.0), ErrorCode::Ok);
        hearth_world_destroy(world);
    }
}
