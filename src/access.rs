//! Accessors (equality, raw interface pointer).

use crate::handle::WmiServiceHandle;
use crate::runtime::WbemRuntime;
use libc::c_int;
use std::ffi::c_void;

/// # Safety
///
/// Same contract as [`wmi_service_equal`].
pub unsafe fn equal_handles<R: WbemRuntime>(
    a: *const WmiServiceHandle<R>,
    b: *const WmiServiceHandle<R>,
) -> c_int {
    match unsafe { (WmiServiceHandle::from_ptr(a), WmiServiceHandle::from_ptr(b)) } {
        (Some(a), Some(b)) => (a.service() == b.service()) as c_int,
        _ => 0,
    }
}

/// # Safety
///
/// Same contract as [`wmi_service_raw`].
pub unsafe fn raw_services<R: WbemRuntime>(handle: *const WmiServiceHandle<R>) -> *mut c_void {
    match unsafe { WmiServiceHandle::from_ptr(handle) } {
        Some(h) => h.service().as_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Check whether two handles share one connection.
///
/// # Returns
///
/// 1 if both handles refer to the same connection, 0 otherwise (including
/// when either handle is NULL). Handles connected separately are never
/// equal, even to the same namespace.
///
/// # Safety
///
/// - `a` and `b` must be valid handles or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_equal(
    a: *const WmiServiceHandle,
    b: *const WmiServiceHandle,
) -> c_int {
    unsafe { equal_handles(a, b) }
}

/// The `IWbemServices*` behind a handle.
///
/// The pointer is borrowed: it stays valid while the handle is open and the
/// caller must not release it. Returns NULL for a NULL handle.
///
/// # Safety
///
/// - `handle` must be a valid handle or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_raw(handle: *const WmiServiceHandle) -> *mut c_void {
    unsafe { raw_services(handle) }
}
