//! # hearth_ffi
//!
//! C ABI over the world core.
//!
//! Worlds live in a process-wide table and are addressed by opaque
//! [`WorldHandle`]s. Any thread may call into any world, but a world serves
//! one call at a time; a second concurrent call fails with
//! `OperationFailed`. Entities cross the boundary as packed `u64`s
//! (`generation << 32 | slot`). Every call returns an [`ErrorCode`] (or a
//! null handle for constructors) and records a message, per calling thread,
//! readable through [`hearth_last_error`] until the next failure or
//! [`hearth_clear_last_error`].
//!
//! Panics never unwind into the host. A panic inside a call on a world
//! poisons that world; every later call on it returns `Panic` and only
//! [`hearth_world_destroy`] succeeds.

pub mod components;
pub mod error;
pub mod handle;
pub mod net;
pub mod raycast;
pub mod world;

pub use components::{
    HEARTH_BODY_DYNAMIC, HEARTH_BODY_KINEMATIC, HEARTH_BODY_STATIC, HearthQuat, HearthRigidBody,
    HearthTransform2D, HearthTransform3D, HearthVelocity2D, HearthVelocity3D,
    hearth_add_box_collider2d, hearth_add_box_collider3d, hearth_add_capsule_collider,
    hearth_add_circle_collider, hearth_add_rigidbody2d, hearth_add_rigidbody3d,
    hearth_add_sphere_collider, hearth_add_transform2d, hearth_add_transform3d,
    hearth_add_velocity2d, hearth_add_velocity3d, hearth_get_rigidbody2d, hearth_get_rigidbody3d,
    hearth_get_transform2d, hearth_get_transform3d, hearth_get_velocity2d, hearth_get_velocity3d,
    hearth_rigidbody2d_apply_force, hearth_rigidbody2d_apply_impulse,
    hearth_rigidbody3d_apply_force, hearth_rigidbody3d_apply_impulse, hearth_set_rigidbody2d,
    hearth_set_rigidbody3d, hearth_set_transform2d, hearth_set_transform3d, hearth_set_velocity2d,
    hearth_set_velocity3d,
};
pub use error::{hearth_clear_last_error, hearth_last_error, last_error_message};
pub use handle::WorldHandle;
pub use hearth_component::ErrorCode;
pub use net::{
    HearthRpcHandler, hearth_call_rpc, hearth_dispatch_rpc, hearth_outbox_len, hearth_outbox_pop,
    hearth_register_rpc, hearth_replicate_entity, hearth_stop_replicating_entity,
};
pub use raycast::{
    HearthRaycastHit2D, HearthRaycastHit3D, HearthVec2, HearthVec3, hearth_raycast2d,
    hearth_raycast3d,
};
pub use world::{
    HearthTimeState, hearth_entity_create, hearth_entity_destroy, hearth_entity_is_alive,
    hearth_entity_parent, hearth_entity_remove_parent, hearth_entity_set_name,
    hearth_entity_set_parent, hearth_world_create, hearth_world_create_with_config,
    hearth_world_destroy, hearth_world_entity_count, hearth_world_find_by_name, hearth_world_load,
    hearth_world_save, hearth_world_set_max_step, hearth_world_set_time_scale, hearth_world_time,
    hearth_world_update,
};
