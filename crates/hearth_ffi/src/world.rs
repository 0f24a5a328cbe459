//! World lifecycle, entities, names, time and persistence.

use std::ffi::c_char;

use hearth_component::{EcsError, Entity, ErrorCode};
use hearth_world::{TimeState, World, WorldConfig, builtin_registry, load_from_path, save_to_path};

use crate::error::{FfiResult, c_str, out_param, record, status};
use crate::handle::{WorldHandle, guarded, register, release, with_world};

/// Time controller state as seen across the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HearthTimeState {
    pub delta_seconds: f32,
    pub total_seconds: f64,
    pub frame_count: u64,
    pub target_fps: f32,
    pub time_scale: f32,
    pub max_step: f32,
    pub fps: f32,
}

impl From<TimeState> for HearthTimeState {
    fn from(state: TimeState) -> Self {
        Self {
            delta_seconds: state.delta_seconds,
            total_seconds: state.total_seconds,
            frame_count: state.frame_count,
            target_fps: state.target_fps,
            time_scale: state.time_scale,
            max_step: state.max_step,
            fps: state.fps,
        }
    }
}

fn attach(build: impl FnOnce() -> FfiResult<World>) -> WorldHandle {
    match guarded(|| register(build()?)) {
        Ok(handle) => handle,
        Err(failure) => {
            record(failure);
            WorldHandle::NULL
        }
    }
}

// ── Lifecycle ───────────────────────────────────────────────────────────────

/// Create a world with default configuration.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_world_create() -> WorldHandle {
    attach(|| Ok(World::new()))
}

/// Create a world from a JSON configuration. Returns the null handle and
/// records the last error on failure.
///
/// # Safety
///
/// `config_json` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_world_create_with_config(config_json: *const c_char) -> WorldHandle {
    attach(|| {
        let json = unsafe { c_str(config_json, "config_json") }?;
        Ok(World::with_config(WorldConfig::from_json_str(json)?))
    })
}

/// Destroy a world. Poisoned worlds may be destroyed.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_world_destroy(world: WorldHandle) -> ErrorCode {
    status(guarded(|| release(world)))
}

/// Advance the world by one frame of `delta_time` wall-clock seconds.
///
/// Per-entity failures inside a phase are logged and do not fail the call.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_world_update(world: WorldHandle, delta_time: f32) -> ErrorCode {
    status(with_world(world, |w| {
        w.update(delta_time)?;
        Ok(())
    }))
}

// ── Persistence ─────────────────────────────────────────────────────────────

/// Write a snapshot of the world to `path`, replacing the file.
///
/// # Safety
///
/// `path` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_world_save(world: WorldHandle, path: *const c_char) -> ErrorCode {
    status(with_world(world, |w| {
        let path = unsafe { c_str(path, "path") }?;
        save_to_path(w, path)?;
        Ok(())
    }))
}

/// Load a snapshot written by [`hearth_world_save`] into a new world with
/// the built-in kinds. Returns the null handle and records the last error
/// on failure.
///
/// # Safety
///
/// `path` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_world_load(path: *const c_char) -> WorldHandle {
    attach(|| {
        let path = unsafe { c_str(path, "path") }?;
        let registry = builtin_registry()?;
        Ok(load_from_path(path, &registry)?)
    })
}

// ── Entities ────────────────────────────────────────────────────────────────

/// Create an entity and write its packed handle to `out_entity`.
///
/// # Safety
///
/// `out_entity` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_entity_create(world: WorldHandle, out_entity: *mut u64) -> ErrorCode {
    status(out_param(out_entity, "out_entity").and_then(|out| {
        with_world(world, |w| {
            let entity = w.create_entity()?;
            unsafe { out.write(entity.to_bits()) };
            Ok(())
        })
    }))
}

/// Destroy an entity and every component it carries.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_entity_destroy(world: WorldHandle, entity: u64) -> ErrorCode {
    status(with_world(world, |w| {
        w.destroy_entity(Entity::from_bits(entity))?;
        Ok(())
    }))
}

/// Returns `true` if `entity` is alive in `world`. Any failure reads as
/// `false`.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_entity_is_alive(world: WorldHandle, entity: u64) -> bool {
    with_world(world, |w| Ok(w.is_alive(Entity::from_bits(entity)))).unwrap_or(false)
}

/// Write the number of live entities to `out_count`.
///
/// # Safety
///
/// `out_count` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_world_entity_count(world: WorldHandle, out_count: *mut u64) -> ErrorCode {
    status(out_param(out_count, "out_count").and_then(|out| {
        with_world(world, |w| {
            unsafe { out.write(w.entity_count() as u64) };
            Ok(())
        })
    }))
}

// ── Names ───────────────────────────────────────────────────────────────────

/// Name `entity`, taking the name from any previous holder.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_entity_set_name(
    world: WorldHandle,
    entity: u64,
    name: *const c_char,
) -> ErrorCode {
    status(with_world(world, |w| {
        let name = unsafe { c_str(name, "name") }?;
        w.set_name(Entity::from_bits(entity), name)?;
        Ok(())
    }))
}

/// Write the entity holding `name` to `out_entity`, or the null entity
/// (`u64::MAX`) if nobody does.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string; `out_entity` must be
/// null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_world_find_by_name(
    world: WorldHandle,
    name: *const c_char,
    out_entity: *mut u64,
) -> ErrorCode {
    status(out_param(out_entity, "out_entity").and_then(|out| {
        with_world(world, |w| {
            let name = unsafe { c_str(name, "name") }?;
            let found = w.find_by_name(name).unwrap_or(Entity::NULL);
            unsafe { out.write(found.to_bits()) };
            Ok(())
        })
    }))
}

// ── Hierarchy ───────────────────────────────────────────────────────────────

/// Attach `child` under `parent`, detaching it from any previous parent.
/// Cycles and self-parenting are `InvalidArgument`.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_entity_set_parent(world: WorldHandle, child: u64, parent: u64) -> ErrorCode {
    status(with_world(world, |w| {
        w.set_parent(Entity::from_bits(child), Entity::from_bits(parent))?;
        Ok(())
    }))
}

/// Detach `child` from its parent. Having none is not an error.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_entity_remove_parent(world: WorldHandle, child: u64) -> ErrorCode {
    status(with_world(world, |w| {
        w.remove_parent(Entity::from_bits(child))?;
        Ok(())
    }))
}

/// Write the parent of `child` to `out_parent`, or the null entity
/// (`u64::MAX`) for a root.
///
/// # Safety
///
/// `out_parent` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_entity_parent(
    world: WorldHandle,
    child: u64,
    out_parent: *mut u64,
) -> ErrorCode {
    status(out_param(out_parent, "out_parent").and_then(|out| {
        with_world(world, |w| {
            let child = Entity::from_bits(child);
            if !w.is_alive(child) {
                return Err(EcsError::InvalidHandle(child).into());
            }
            let parent = w.parent_of(child).unwrap_or(Entity::NULL);
            unsafe { out.write(parent.to_bits()) };
            Ok(())
        })
    }))
}

// ── Time ────────────────────────────────────────────────────────────────────

/// Copy the time controller's state to `out_state`.
///
/// # Safety
///
/// `out_state` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_world_time(
    world: WorldHandle,
    out_state: *mut HearthTimeState,
) -> ErrorCode {
    status(out_param(out_state, "out_state").and_then(|out| {
        with_world(world, |w| {
            unsafe { out.write(w.time().snapshot().into()) };
            Ok(())
        })
    }))
}

/// Set the multiplier applied to wall-clock deltas.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_world_set_time_scale(world: WorldHandle, scale: f32) -> ErrorCode {
    status(with_world(world, |w| {
        w.time_mut().set_time_scale(scale)?;
        Ok(())
    }))
}

/// Set the upper bound on one frame's simulated delta.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_world_set_max_step(world: WorldHandle, max_step: f32) -> ErrorCode {
    status(with_world(world, |w| {
        w.time_mut().set_max_step(max_step)?;
        Ok(())
    }))
}
