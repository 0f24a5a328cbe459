//! Replication control, remote procedure calls and the encoded outbox.

use std::ffi::{c_char, c_void};
use std::ptr::NonNull;

use hearth_component::{EcsError, EcsResult, Entity, ErrorCode};
use hearth_net::Envelope;

use crate::error::{Failure, byte_slice, c_str, out_param, status};
use crate::handle::{WorldHandle, with_world};

/// Host handler for an inbound RPC. Returns zero on success; any other
/// value fails the dispatch with `OperationFailed`.
pub type HearthRpcHandler = unsafe extern "C" fn(
    user_data: *mut c_void,
    entity: u64,
    payload: *const u8,
    payload_len: usize,
) -> i32;

struct HostHandler {
    handler: HearthRpcHandler,
    user_data: *mut c_void,
}

// SAFETY: `hearth_register_rpc` requires `user_data` to be usable from any
// thread that calls into the world.
unsafe impl Send for HostHandler {}
unsafe impl Sync for HostHandler {}

impl HostHandler {
    fn call(&self, name: &str, entity: Entity, payload: &[u8]) -> EcsResult<()> {
        let status = unsafe {
            (self.handler)(self.user_data, entity.to_bits(), payload.as_ptr(), payload.len())
        };
        if status == 0 {
            Ok(())
        } else {
            Err(EcsError::failed(format!("rpc `{name}` handler returned {status}")))
        }
    }
}

/// Start replicating `entity` at normal priority and the world's default
/// rate.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_replicate_entity(world: WorldHandle, entity: u64) -> ErrorCode {
    status(with_world(world, |w| {
        w.replicate_entity(Entity::from_bits(entity))?;
        Ok(())
    }))
}

/// Stop replicating `entity`. Not replicating it already is not an error.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_stop_replicating_entity(world: WorldHandle, entity: u64) -> ErrorCode {
    status(with_world(world, |w| {
        w.stop_replicating_entity(Entity::from_bits(entity))?;
        Ok(())
    }))
}

/// Register `handler` for RPC `name`, replacing any previous handler.
///
/// The handler runs inside [`hearth_dispatch_rpc`] while the world is
/// checked out; calls back into the same world from it fail with
/// `OperationFailed`.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string. `user_data` is passed
/// back untouched and must stay valid, and usable from any thread calling
/// into this world, until the handler is replaced or the world destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_register_rpc(
    world: WorldHandle,
    name: *const c_char,
    handler: Option<HearthRpcHandler>,
    user_data: *mut c_void,
) -> ErrorCode {
    status(with_world(world, |w| {
        let name = unsafe { c_str(name, "name") }?;
        let handler = handler.ok_or_else(|| Failure::null_pointer("handler"))?;
        let host = HostHandler { handler, user_data };
        let rpc = name.to_owned();
        w.register_rpc(name, move |_, entity, payload| host.call(&rpc, entity, payload))?;
        Ok(())
    }))
}

/// Queue an outbound call to `name` concerning `entity`.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string; `payload` must be null
/// or valid for `payload_len` byte reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_call_rpc(
    world: WorldHandle,
    name: *const c_char,
    entity: u64,
    payload: *const u8,
    payload_len: usize,
) -> ErrorCode {
    status(with_world(world, |w| {
        let name = unsafe { c_str(name, "name") }?;
        let payload = unsafe { byte_slice(payload, payload_len, "payload") }?;
        w.call_rpc(name, Entity::from_bits(entity), payload.to_vec())?;
        Ok(())
    }))
}

/// Decode an encoded RPC envelope and run its registered handler.
///
/// # Safety
///
/// `envelope` must be null or valid for `len` byte reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_dispatch_rpc(
    world: WorldHandle,
    envelope: *const u8,
    len: usize,
) -> ErrorCode {
    status(with_world(world, |w| {
        let bytes = unsafe { byte_slice(envelope, len, "envelope") }?;
        let envelope = Envelope::from_bytes(bytes).map_err(EcsError::from)?;
        w.dispatch_rpc(&envelope)?;
        Ok(())
    }))
}

/// Write the number of queued envelopes to `out_len`.
///
/// # Safety
///
/// `out_len` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_outbox_len(world: WorldHandle, out_len: *mut usize) -> ErrorCode {
    status(out_param(out_len, "out_len").and_then(|out| {
        with_world(world, |w| {
            unsafe { out.write(w.outbox_len()) };
            Ok(())
        })
    }))
}

/// Move the oldest queued envelope, encoded, into `buffer`.
///
/// `out_written` receives the encoded length, or zero when the outbox is
/// empty. If `capacity` is too small the envelope stays queued,
/// `out_written` receives the length needed and the call returns
/// `InvalidArgument`.
///
/// # Safety
///
/// `buffer` must be null or valid for `capacity` byte writes; `out_written`
/// must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hearth_outbox_pop(
    world: WorldHandle,
    buffer: *mut u8,
    capacity: usize,
    out_written: *mut usize,
) -> ErrorCode {
    status(out_param(out_written, "out_written").and_then(|written| {
        with_world(world, |w| {
            let Some(envelope) = w.peek_envelope() else {
                unsafe { written.write(0) };
                return Ok(());
            };
            let bytes = envelope.to_bytes().map_err(EcsError::from)?;
            unsafe { written.write(bytes.len()) };
            if bytes.len() > capacity {
                return Err(Failure::new(
                    ErrorCode::InvalidArgument,
                    format!("envelope needs {} bytes, buffer holds {capacity}", bytes.len()),
                ));
            }
            let buffer: NonNull<u8> = out_param(buffer, "buffer")?;
            unsafe { buffer.as_ptr().copy_from_nonoverlapping(bytes.as_ptr(), bytes.len()) };
            w.pop_envelope();
            Ok(())
        })
    }))
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::ptr;
    use std::sync::Mutex;

    use hearth_net::DeltaKind;

    use super::*;
    use crate::world::{hearth_entity_create, hearth_world_create, hearth_world_destroy, hearth_world_update};

    #[test]
    fn test_replicated_spawn_reaches_outbox() {
        let world = hearth_world_create();
        let mut e = 0u64;
        unsafe { hearth_entity_create(world, &mut e) };
        assert_eq!(hearth_replicate_entity(world, e), ErrorCode::Ok);
        assert_eq!(hearth_world_update(world, 0.016), ErrorCode::Ok);

        let mut len = 0usize;
        assert_eq!(unsafe { hearth_outbox_len(world, &mut len) }, ErrorCode::Ok);
        assert_eq!(len, 1);

        let mut needed = 0usize;
        let code = unsafe { hearth_outbox_pop(world, ptr::null_mut(), 0, &mut needed) };
        assert_eq!(code, ErrorCode::InvalidArgument);
        assert!(needed > 0);

        let mut buffer = vec![0u8; needed];
        let mut written = 0usize;
        let code =
            unsafe { hearth_outbox_pop(world, buffer.as_mut_ptr(), buffer.len(), &mut written) };
        assert_eq!(code, ErrorCode::Ok);
        assert_eq!(written, needed);

        let delta = Envelope::from_bytes(&buffer).unwrap().to_delta().unwrap();
        assert_eq!(delta.entity, Entity::from_bits(e));
        assert_eq!(delta.kind, DeltaKind::Spawn);

        unsafe { hearth_outbox_pop(world, buffer.as_mut_ptr(), buffer.len(), &mut written) };
        assert_eq!(written, 0);
        hearth_world_destroy(world);
    }

    #[test]
    fn test_replicating_dead_entity_fails() {
        let world = hearth_world_create();
        assert_eq!(hearth_replicate_entity(world, 42), ErrorCode::InvalidHandle);
        assert_eq!(hearth_stop_replicating_entity(world, 42), ErrorCode::InvalidHandle);
        hearth_world_destroy(world);
    }

    type Calls = Mutex<Vec<(u64, Vec<u8>)>>;

    unsafe extern "C" fn remember(
        user_data: *mut c_void,
        entity: u64,
        payload: *const u8,
        payload_len: usize,
    ) -> i32 {
        let calls = unsafe { &*user_data.cast::<Calls>() };
        let bytes = unsafe { std::slice::from_raw_parts(payload, payload_len) };
        calls.lock().unwrap().push((entity, bytes.to_vec()));
        0
    }

    unsafe extern "C" fn refuse(_: *mut c_void, _: u64, _: *const u8, _: usize) -> i32 {
        7
    }

    fn pop(world: WorldHandle) -> Vec<u8> {
        let mut needed = 0usize;
        unsafe { hearth_outbox_pop(world, ptr::null_mut(), 0, &mut needed) };
        let mut buffer = vec![0u8; needed];
        let mut written = 0usize;
        let code =
            unsafe { hearth_outbox_pop(world, buffer.as_mut_ptr(), buffer.len(), &mut written) };
        assert_eq!(code, ErrorCode::Ok);
        buffer
    }

    #[test]
    fn test_rpc_call_then_dispatch() {
        let world = hearth_world_create();
        let mut e = 0u64;
        unsafe { hearth_entity_create(world, &mut e) };
        let calls: Calls = Mutex::new(Vec::new());
        let user_data = ptr::from_ref(&calls).cast_mut().cast::<c_void>();
        let jump = CString::new("jump").unwrap();

        let code = unsafe { hearth_register_rpc(world, jump.as_ptr(), Some(remember), user_data) };
        assert_eq!(code, ErrorCode::Ok);
        let payload = [1u8, 2, 3];
        let code =
            unsafe { hearth_call_rpc(world, jump.as_ptr(), e, payload.as_ptr(), payload.len()) };
        assert_eq!(code, ErrorCode::Ok);

        let envelope = pop(world);
        assert_eq!(Envelope::from_bytes(&envelope).unwrap().rpc_name(), Some("jump"));
        let code = unsafe { hearth_dispatch_rpc(world, envelope.as_ptr(), envelope.len()) };
        assert_eq!(code, ErrorCode::Ok);
        assert_eq!(*calls.lock().unwrap(), vec![(e, payload.to_vec())]);

        let code = unsafe { hearth_call_rpc(world, jump.as_ptr(), e, ptr::null(), 0) };
        assert_eq!(code, ErrorCode::Ok);
        let envelope = pop(world);
        unsafe { hearth_dispatch_rpc(world, envelope.as_ptr(), envelope.len()) };
        assert_eq!(calls.lock().unwrap()[1], (e, Vec::new()));
        hearth_world_destroy(world);
    }

    #[test]
    fn test_rpc_failures() {
        let world = hearth_world_create();
        let mut e = 0u64;
        unsafe { hearth_entity_create(world, &mut e) };
        let fire = CString::new("fire").unwrap();
        let bad = CString::new("no spaces").unwrap();

        let code = unsafe { hearth_call_rpc(world, fire.as_ptr(), e, ptr::null(), 0) };
        assert_eq!(code, ErrorCode::InvalidArgument);
        let code = unsafe { hearth_register_rpc(world, fire.as_ptr(), None, ptr::null_mut()) };
        assert_eq!(code, ErrorCode::NullPointer);
        let code = unsafe { hearth_register_rpc(world, bad.as_ptr(), Some(refuse), ptr::null_mut()) };
        assert_eq!(code, ErrorCode::InvalidArgument);

        let code = unsafe { hearth_register_rpc(world, fire.as_ptr(), Some(refuse), ptr::null_mut()) };
        assert_eq!(code, ErrorCode::Ok);
        let code = unsafe { hearth_call_rpc(world, fire.as_ptr(), e, ptr::null(), 4) };
        assert_eq!(code, ErrorCode::NullPointer);
        assert_eq!(unsafe { hearth_call_rpc(world, fire.as_ptr(), 99, ptr::null(), 0) }, ErrorCode::InvalidHandle);

        unsafe { hearth_call_rpc(world, fire.as_ptr(), e, ptr::null(), 0) };
        let envelope = pop(world);
        let code = unsafe { hearth_dispatch_rpc(world, envelope.as_ptr(), envelope.len()) };
        assert_eq!(code, ErrorCode::OperationFailed);

        let garbage = [0xc1u8, 0x00];
        let code = unsafe { hearth_dispatch_rpc(world, garbage.as_ptr(), garbage.len()) };
        assert_ne!(code, ErrorCode::Ok);
        hearth_world_destroy(world);
    }
}
