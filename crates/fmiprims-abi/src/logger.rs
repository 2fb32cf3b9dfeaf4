//! Callbacks handed to components at instantiation.
//!
//! Both ABI revisions declare the logger as a C variadic function. The
//! callbacks here are declared with the fixed parameters only: the message is
//! forwarded verbatim and printf-style arguments are not expanded.

use std::ffi::{c_char, c_int, c_void, CStr};

use tracing::{debug, error, warn};

use crate::status::StatusCode;

/// Tracing target for messages emitted by native components.
pub const COMPONENT_TARGET: &str = "fmiprims::component";

pub(crate) type AllocateMemory = unsafe extern "C" fn(nobj: usize, size: usize) -> *mut c_void;
pub(crate) type FreeMemory = unsafe extern "C" fn(obj: *mut c_void);

pub(crate) unsafe extern "C" fn allocate_memory(nobj: usize, size: usize) -> *mut c_void {
    // SAFETY: calloc accepts any sizes and returns null on failure.
    unsafe { libc::calloc(nobj, size) }
}

pub(crate) unsafe extern "C" fn free_memory(obj: *mut c_void) {
    // SAFETY: components only hand back pointers obtained from `allocate_memory`.
    unsafe { libc::free(obj) }
}

/// Logger for ABI v1: the first argument is the component itself.
pub(crate) unsafe extern "C" fn log_v1(
    _component: *mut c_void,
    instance_name: *const c_char,
    status: c_int,
    category: *const c_char,
    message: *const c_char,
) {
    // SAFETY: the component passes NUL-terminated strings or null.
    unsafe { forward(crate::v1::status_from_raw(status), instance_name, category, message) }
}

/// Logger for ABI v2: the first argument is the (always null) environment.
pub(crate) unsafe extern "C" fn log_v2(
    _environment: *mut c_void,
    instance_name: *const c_char,
    status: c_int,
    category: *const c_char,
    message: *const c_char,
) {
    // SAFETY: the component passes NUL-terminated strings or null.
    unsafe { forward(crate::v2::status_from_raw(status), instance_name, category, message) }
}

unsafe fn forward(
    status: StatusCode,
    instance_name: *const c_char,
    category: *const c_char,
    message: *const c_char,
) {
    // SAFETY: forwarded from the callback contracts above.
    let (instance, category, message) = unsafe {
        (
            lossy_or(instance_name, "?"),
            lossy_or(category, "?"),
            lossy_or(message, ""),
        )
    };

    match status {
        StatusCode::Error | StatusCode::Fatal => {
            error!(target: COMPONENT_TARGET, %instance, %category, %status, "{message}")
        }
        StatusCode::Warning | StatusCode::Discard => {
            warn!(target: COMPONENT_TARGET, %instance, %category, %status, "{message}")
        }
        _ => debug!(target: COMPONENT_TARGET, %instance, %category, %status, "{message}"),
    }
}

/// Copy a borrowed C string, substituting `fallback` for null.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for the call.
pub(crate) unsafe fn lossy_or(ptr: *const c_char, fallback: &str) -> String {
    if ptr.is_null() {
        return fallback.to_string();
    }
    // SAFETY: non-null and NUL-terminated per the function contract.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
