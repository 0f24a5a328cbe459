//! Status codes and the per-thread last-error string.

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char};
use std::ptr::{self, NonNull};

use hearth_component::{EcsError, ErrorCode};
use tracing::debug;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// A failed boundary call: the code returned and the message recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub code: ErrorCode,
    pub message: String,
}

impl Failure {
    pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn null_pointer(what: &str) -> Self {
        Self::new(ErrorCode::NullPointer, format!("`{what}` is null"))
    }
}

impl From<EcsError> for Failure {
    fn from(err: EcsError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

pub(crate) type FfiResult<T> = Result<T, Failure>;

/// Store `failure` as this thread's last error and return its code.
pub(crate) fn record(failure: Failure) -> ErrorCode {
    debug!(code = ?failure.code, message = %failure.message, "boundary call failed");
    let message = CString::new(failure.message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
    failure.code
}

/// Collapse a call result into its status code.
pub(crate) fn status(result: FfiResult<()>) -> ErrorCode {
    match result {
        Ok(()) => ErrorCode::Ok,
        Err(failure) => record(failure),
    }
}

/// The last recorded message on this thread, for Rust callers and tests.
#[must_use]
pub fn last_error_message() -> Option<String> {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|message| message.to_string_lossy().into_owned())
    })
}

/// Borrow a C string argument.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> FfiResult<&'a str> {
    if ptr.is_null() {
        return Err(Failure::null_pointer(what));
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| {
        Failure::new(
            ErrorCode::InvalidArgument,
            format!("`{what}` is not valid UTF-8"),
        )
    })
}

/// Borrow a byte buffer argument. A zero length accepts a null pointer.
///
/// # Safety
///
/// `ptr` must be null or valid for `len` byte reads for `'a`.
pub(crate) unsafe fn byte_slice<'a>(ptr: *const u8, len: usize, what: &str) -> FfiResult<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(Failure::null_pointer(what));
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Check an out-parameter before anything is mutated.
pub(crate) fn out_param<T>(ptr: *mut T, what: &str) -> FfiResult<NonNull<T>> {
    NonNull::new(ptr).ok_or_else(|| Failure::null_pointer(what))
}

/// The message of the most recent failing call on this thread, or null.
///
/// The pointer stays valid until the next failing call or
/// [`hearth_clear_last_error`] on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}

/// Forget this thread's last error.
#[unsafe(no_mangle)]
pub extern "C" fn hearth_clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_clear() {
        hearth_clear_last_error();
        assert!(hearth_last_error().is_null());

        let code = record(Failure::new(ErrorCode::InvalidArgument, "bad\0value"));
        assert_eq!(code, ErrorCode::InvalidArgument);
        assert_eq!(last_error_message().as_deref(), Some("bad value"));
        assert!(!hearth_last_error().is_null());

        hearth_clear_last_error();
        assert_eq!(last_error_message(), None);
    }

    #[test]
    fn test_success_keeps_previous_error() {
        record(Failure::null_pointer("out"));
        assert_eq!(status(Ok(())), ErrorCode::Ok);
        assert_eq!(last_error_message().as_deref(), Some("`out` is null"));
    }

    #[test]
    fn test_empty_buffer_may_be_null() {
        assert_eq!(unsafe { byte_slice(ptr::null(), 0, "payload") }.unwrap(), &[] as &[u8]);
        let err = unsafe { byte_slice(ptr::null(), 3, "payload") }.unwrap_err();
        assert_eq!(err.code, ErrorCode::NullPointer);
    }

    #[test]
    fn test_null_string_is_null_pointer() {
        let err = unsafe { c_str(ptr::null(), "path") }.unwrap_err();
        assert_eq!(err.code, ErrorCode::NullPointer);
    }

    #[test]
    fn test_ecs_error_keeps_code() {
        let failure = Failure::from(EcsError::failed("nope"));
        assert_eq!(failure.code, ErrorCode::OperationFailed);
        assert!(failure.message.contains("nope"));
    }
}
