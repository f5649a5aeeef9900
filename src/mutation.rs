//! Mutating functions (assign, delete_path).

use crate::error::WmiFfiError;
use crate::handle::WmiServiceHandle;
use crate::runtime::WbemRuntime;
use crate::util::{set_error, set_ok, wstr_to_bstr};
use libc::c_int;

/// # Safety
///
/// Same contract as [`wmi_service_delete_path`].
pub unsafe fn delete_path_handle<R: WbemRuntime>(
    handle: *const WmiServiceHandle<R>,
    object_path: *const u16,
    error: *mut WmiFfiError,
) -> c_int {
    let handle = match unsafe { WmiServiceHandle::from_ptr(handle) } {
        Some(h) => h,
        None => return unsafe { set_error(error, WmiFfiError::invalid_handle()) },
    };

    let object_path = match unsafe { wstr_to_bstr(object_path, "object_path") } {
        Ok(p) => p,
        Err(e) => return unsafe { set_error(error, e) },
    };

    match handle.service().delete_path(object_path) {
        Ok(()) => {
            unsafe { set_ok(error) };
            1
        }
        Err(e) => unsafe { set_error(error, e.into()) },
    }
}

/// # Safety
///
/// Same contract as [`wmi_service_assign`].
pub unsafe fn assign_handle<R: WbemRuntime>(
    target: *mut WmiServiceHandle<R>,
    source: *const WmiServiceHandle<R>,
    error: *mut WmiFfiError,
) -> c_int {
    if std::ptr::eq(target.cast_const(), source) {
        return match unsafe { WmiServiceHandle::from_ptr(source) } {
            Some(_) => {
                unsafe { set_ok(error) };
                1
            }
            None => unsafe { set_error(error, WmiFfiError::invalid_handle()) },
        };
    }

    let (target, source) = match unsafe {
        (
            WmiServiceHandle::from_ptr_mut(target),
            WmiServiceHandle::from_ptr(source),
        )
    } {
        (Some(t), Some(s)) => (t, s),
        _ => return unsafe { set_error(error, WmiFfiError::invalid_handle()) },
    };

    match target.service_mut().assign(source.service()) {
        Ok(()) => {
            unsafe { set_ok(error) };
            1
        }
        Err(e) => unsafe { set_error(error, e.into()) },
    }
}

/// Delete a WMI object and wait for the deletion to finish.
///
/// # Parameters
///
/// - `handle`: Valid service handle
/// - `object_path`: Object path, e.g. `MyClass.MyProperty1='33',MyProperty2='value'`
///   (UTF-16, null-terminated)
/// - `error`: Out-parameter for error information
///
/// # Returns
///
/// 1 on success, 0 on failure (check error->code).
///
/// `WMI_ERROR_CALL_SUBMISSION`, `WMI_ERROR_CALL_COMPLETION` and
/// `WMI_ERROR_CALL_RESULT` tell apart a call that was never submitted, one
/// whose outcome is unknown, and one that completed with a failure (for
/// example `WBEM_E_NOT_FOUND` in `error->hresult`).
///
/// # Blocking
///
/// Blocks until the service reports completion. There is no timeout.
///
/// # Safety
///
/// - `handle` must be a valid handle
/// - `object_path` must be a valid null-terminated UTF-16 string or NULL
/// - `error` must be a valid pointer or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_delete_path(
    handle: *const WmiServiceHandle,
    object_path: *const u16,
    error: *mut WmiFfiError,
) -> c_int {
    unsafe { delete_path_handle(handle, object_path, error) }
}

/// Point `target` at the connection held by `source`.
///
/// On failure `target` keeps its previous connection.
///
/// # Returns
///
/// 1 on success, 0 on failure.
///
/// # Safety
///
/// - `target` and `source` must be valid handles (they may be the same handle)
/// - `error` must be a valid pointer or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_assign(
    target: *mut WmiServiceHandle,
    source: *const WmiServiceHandle,
    error: *mut WmiFfiError,
) -> c_int {
    unsafe { assign_handle(target, source, error) }
}
