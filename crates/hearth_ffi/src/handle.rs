//! Process-wide table of worlds behind opaque handles.
//!
//! A handle is `generation << 32 | slot`; zero is the null handle. Any
//! thread may use any handle, one call at a time: a world is checked out of
//! its slot for the length of a call, so a second call on the same world
//! (from another thread, or re-entrantly from an RPC handler) is rejected
//! instead of aliasing it. The table lock is held only to check a world in
//! or out, never while the world runs. A call that panics poisons the slot:
//! the world is dropped and every later call on the handle reports
//! [`ErrorCode::Panic`] until it is destroyed.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use hearth_component::ErrorCode;
use hearth_world::World;
use tracing::{error, info, warn};

use crate::error::{Failure, FfiResult};

/// Opaque reference to a world in the process-wide table.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldHandle(pub u64);

impl WorldHandle {
    /// Never refers to a world.
    pub const NULL: WorldHandle = WorldHandle(0);

    const fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | slot as u64)
    }

    const fn slot(self) -> u32 {
        self.0 as u32
    }

    const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns `true` for [`WorldHandle::NULL`].
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

enum Occupant {
    Vacant,
    Idle(Box<World>),
    Busy,
    Poisoned,
}

struct Entry {
    generation: u32,
    occupant: Occupant,
}

struct WorldTable {
    entries: Vec<Entry>,
    free: VecDeque<u32>,
}

impl WorldTable {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: VecDeque::new(),
        }
    }

    fn insert(&mut self, world: Box<World>) -> FfiResult<WorldHandle> {
        if let Some(slot) = self.free.pop_front() {
            if let Some(entry) = self.entries.get_mut(slot as usize) {
                entry.occupant = Occupant::Idle(world);
                return Ok(WorldHandle::new(slot, entry.generation));
            }
        }
        let slot = u32::try_from(self.entries.len())
            .map_err(|_| Failure::new(ErrorCode::OutOfMemory, "world table is full"))?;
        self.entries.push(Entry {
            generation: 1,
            occupant: Occupant::Idle(world),
        });
        Ok(WorldHandle::new(slot, 1))
    }

    fn entry_mut(&mut self, handle: WorldHandle) -> FfiResult<&mut Entry> {
        self.entries
            .get_mut(handle.slot() as usize)
            .filter(|entry| {
                entry.generation == handle.generation()
                    && !matches!(entry.occupant, Occupant::Vacant)
            })
            .ok_or_else(|| invalid(handle))
    }

    fn checkout(&mut self, handle: WorldHandle) -> FfiResult<Box<World>> {
        let entry = self.entry_mut(handle)?;
        match std::mem::replace(&mut entry.occupant, Occupant::Busy) {
            Occupant::Idle(world) => Ok(world),
            Occupant::Poisoned => {
                entry.occupant = Occupant::Poisoned;
                Err(Failure::new(
                    ErrorCode::Panic,
                    "world panicked in an earlier call and must be destroyed",
                ))
            }
            Occupant::Busy | Occupant::Vacant => Err(busy(handle)),
        }
    }

    fn checkin(&mut self, handle: WorldHandle, world: Box<World>) {
        if let Ok(entry) = self.entry_mut(handle) {
            entry.occupant = Occupant::Idle(world);
        }
    }

    fn poison(&mut self, handle: WorldHandle) {
        if let Ok(entry) = self.entry_mut(handle) {
            entry.occupant = Occupant::Poisoned;
        }
    }

    fn remove(&mut self, handle: WorldHandle) -> FfiResult<Option<Box<World>>> {
        let slot = handle.slot();
        let entry = self.entry_mut(handle)?;
        if matches!(entry.occupant, Occupant::Busy) {
            return Err(busy(handle));
        }
        let previous = std::mem::replace(&mut entry.occupant, Occupant::Vacant);
        match entry.generation.checked_add(1) {
            Some(next) => {
                entry.generation = next;
                self.free.push_back(slot);
            }
            // Out of generations: the slot stays vacant for good.
            None => warn!(slot, "world slot retired"),
        }
        Ok(match previous {
            Occupant::Idle(world) => Some(world),
            _ => None,
        })
    }
}

static WORLDS: Mutex<WorldTable> = Mutex::new(WorldTable::new());

/// The table lock. Nothing panics while holding it, so a poisoned lock
/// still guards a consistent table.
fn table() -> MutexGuard<'static, WorldTable> {
    WORLDS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid(handle: WorldHandle) -> Failure {
    Failure::new(
        ErrorCode::InvalidHandle,
        format!("invalid world handle {:#x}", handle.0),
    )
}

fn busy(handle: WorldHandle) -> Failure {
    Failure::new(
        ErrorCode::OperationFailed,
        format!("world {:#x} is already inside a call", handle.0),
    )
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Run `f`, turning a panic into a [`ErrorCode::Panic`] failure.
pub(crate) fn guarded<R>(f: impl FnOnce() -> FfiResult<R>) -> FfiResult<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(Failure::new(
            ErrorCode::Panic,
            format!("panic: {}", panic_text(payload.as_ref())),
        ))
    })
}

/// Hand `world` to the table.
pub(crate) fn register(world: World) -> FfiResult<WorldHandle> {
    let id = world.id();
    let handle = table().insert(Box::new(world))?;
    info!(world = %id, handle = handle.0, "world attached");
    Ok(handle)
}

/// Drop the world behind `handle`. Poisoned handles are released too.
pub(crate) fn release(handle: WorldHandle) -> FfiResult<()> {
    let world = table().remove(handle)?;
    if let Some(world) = world {
        info!(world = %world.id(), handle = handle.0, "world released");
    }
    Ok(())
}

/// Run `f` against the world behind `handle`.
pub(crate) fn with_world<R>(
    handle: WorldHandle,
    f: impl FnOnce(&mut World) -> FfiResult<R>,
) -> FfiResult<R> {
    let mut world = table().checkout(handle)?;
    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut world))) {
        Ok(result) => {
            table().checkin(handle, world);
            result
        }
        Err(payload) => {
            let message = panic_text(payload.as_ref());
            error!(world = %world.id(), handle = handle.0, %message, "world poisoned by panic");
            table().poison(handle);
            Err(Failure::new(ErrorCode::Panic, format!("panic: {message}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handle_is_invalid() {
        let handle = register(World::new()).unwrap();
        release(handle).unwrap();
        let err = with_world(handle, |_| Ok(())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidHandle);
        assert_eq!(release(handle).unwrap_err().code, ErrorCode::InvalidHandle);
    }

    #[test]
    fn test_released_slot_is_reused_with_new_generation() {
        let mut table = WorldTable::new();
        let first = table.insert(Box::new(World::new())).unwrap();
        assert!(table.remove(first).unwrap().is_some());
        let second = table.insert(Box::new(World::new())).unwrap();
        assert_eq!(second.slot(), first.slot());
        assert_eq!(second.generation(), first.generation() + 1);
        assert!(table.checkout(first).is_err());
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut table = WorldTable::new();
        let old = table.insert(Box::new(World::new())).unwrap();
        table.entries[old.slot() as usize].generation = u32::MAX;
        let last = WorldHandle::new(old.slot(), u32::MAX);
        table.remove(last).unwrap();

        assert!(table.free.is_empty());
        let fresh = table.insert(Box::new(World::new())).unwrap();
        assert_ne!(fresh.slot(), last.slot());
        assert_eq!(table.checkout(last).unwrap_err().code, ErrorCode::InvalidHandle);
        assert_eq!(table.checkout(old).unwrap_err().code, ErrorCode::InvalidHandle);
    }

    #[test]
    fn test_handle_works_from_another_thread() {
        let handle = register(World::new()).unwrap();
        let frame = std::thread::spawn(move || {
            with_world(handle, |w| {
                w.update(0.016)?;
                Ok(w.time().frame_count())
            })
        })
        .join()
        .unwrap()
        .unwrap();
        assert_eq!(frame, 1);
        assert_eq!(with_world(handle, |w| Ok(w.time().frame_count())).unwrap(), 1);
        release(handle).unwrap();
    }

    #[test]
    fn test_concurrent_use_of_one_world_is_rejected() {
        use std::sync::mpsc;

        let handle = register(World::new()).unwrap();
        let (entered, wait_entered) = mpsc::channel();
        let (finish, wait_finish) = mpsc::channel::<()>();
        let holder = std::thread::spawn(move || {
            with_world(handle, |_| {
                entered.send(()).ok();
                wait_finish.recv().ok();
                Ok(())
            })
        });

        wait_entered.recv().unwrap();
        let err = with_world(handle, |_| Ok(())).unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationFailed);
        assert_eq!(release(handle).unwrap_err().code, ErrorCode::OperationFailed);

        finish.send(()).unwrap();
        holder.join().unwrap().unwrap();
        release(handle).unwrap();
    }

    #[test]
    fn test_null_handle_is_invalid() {
        assert!(WorldHandle::NULL.is_null());
        let err = with_world(WorldHandle::NULL, |_| Ok(())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidHandle);
    }

    #[test]
    fn test_panic_poisons_world() {
        let handle = register(World::new()).unwrap();
        let err = with_world(handle, |_| -> FfiResult<()> { panic!("boom") }).unwrap_err();
        assert_eq!(err.code, ErrorCode::Panic);
        assert!(err.message.contains("boom"));

        let again = with_world(handle, |_| Ok(())).unwrap_err();
        assert_eq!(again.code, ErrorCode::Panic);
        release(handle).unwrap();
        assert_eq!(
            with_world(handle, |_| Ok(())).unwrap_err().code,
            ErrorCode::InvalidHandle
        );
    }

    #[test]
    fn test_reentrant_call_is_rejected() {
        let handle = register(World::new()).unwrap();
        let inner = with_world(handle, |_| Ok(with_world(handle, |_| Ok(())))).unwrap();
        assert_eq!(inner.unwrap_err().code, ErrorCode::OperationFailed);
        assert!(release(handle).is_ok());
    }

    #[test]
    fn test_guarded_catches_panics() {
        let err = guarded(|| -> FfiResult<()> { panic!("{}", 7) }).unwrap_err();
        assert_eq!(err.code, ErrorCode::Panic);
        assert!(err.message.contains('7'));
    }
}
