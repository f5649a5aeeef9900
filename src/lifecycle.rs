//! Lifecycle management functions (connect, clone, close).
//!
//! The `extern "C"` functions use the platform runtime. They delegate to the
//! generic functions below, which take any [`WbemRuntime`].

use crate::error::WmiFfiError;
use crate::handle::WmiServiceHandle;
use crate::options::ConnectOptions;
use crate::platform::PlatformRuntime;
use crate::runtime::WbemRuntime;
use crate::service::WmiService;
use crate::util::{cstr_to_option_string, set_error_null, set_ok, wstr_to_bstr};
use std::os::raw::c_char;

/// Connect with `runtime` and box the result as a handle.
///
/// # Safety
///
/// Same contract as [`wmi_service_connect_with_options`].
pub unsafe fn connect_handle<R: WbemRuntime>(
    runtime: R,
    namespace: *const u16,
    options_json: *const c_char,
    error: *mut WmiFfiError,
) -> *mut WmiServiceHandle<R> {
    let namespace = match unsafe { wstr_to_bstr(namespace, "namespace") } {
        Ok(ns) => ns,
        Err(e) => return unsafe { set_error_null(error, e) },
    };

    let options = match unsafe { cstr_to_option_string(options_json, "options_json") } {
        Ok(Some(json)) => match ConnectOptions::from_json(&json) {
            Ok(opts) => opts,
            Err(e) => return unsafe { set_error_null(error, WmiFfiError::json_parse(e)) },
        },
        Ok(None) => ConnectOptions::default(),
        Err(e) => return unsafe { set_error_null(error, e) },
    };

    match WmiService::connect_with_options(runtime, namespace, &options) {
        Ok(service) => {
            unsafe { set_ok(error) };
            Box::into_raw(WmiServiceHandle::new(service))
        }
        Err(e) => unsafe { set_error_null(error, e.into()) },
    }
}

/// Copy a handle onto the calling thread.
///
/// # Safety
///
/// Same contract as [`wmi_service_clone`].
pub unsafe fn clone_handle<R: WbemRuntime>(
    handle: *const WmiServiceHandle<R>,
    error: *mut WmiFfiError,
) -> *mut WmiServiceHandle<R> {
    let handle = match unsafe { WmiServiceHandle::from_ptr(handle) } {
        Some(h) => h,
        None => return unsafe { set_error_null(error, WmiFfiError::invalid_handle()) },
    };

    match handle.service().try_clone() {
        Ok(service) => {
            unsafe { set_ok(error) };
            Box::into_raw(WmiServiceHandle::new(service))
        }
        Err(e) => unsafe { set_error_null(error, e.into()) },
    }
}

/// Free a handle.
///
/// # Safety
///
/// Same contract as [`wmi_service_close`].
pub unsafe fn close_handle<R: WbemRuntime>(handle: *mut WmiServiceHandle<R>) {
    if handle.is_null() {
        return;
    }

    // Take ownership and drop
    unsafe {
        drop(Box::from_raw(handle));
    }
}

/// Connect to a WMI namespace on the local machine.
///
/// # Parameters
///
/// - `namespace`: Namespace path, e.g. `ROOT\StandardCimv2` (UTF-16, null-terminated)
/// - `error`: Out-parameter for error information
///
/// # Returns
///
/// Handle on success, NULL on failure.
///
/// # Ownership
///
/// Caller owns the returned handle. Must call `wmi_service_close()` to free.
///
/// # Safety
///
/// - `namespace` must be a valid null-terminated UTF-16 string or NULL
/// - `error` must be a valid pointer or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_connect(
    namespace: *const u16,
    error: *mut WmiFfiError,
) -> *mut WmiServiceHandle {
    unsafe { connect_handle(PlatformRuntime::default(), namespace, std::ptr::null(), error) }
}

/// Connect with options (JSON configuration).
///
/// # Parameters
///
/// - `namespace`: Namespace path (UTF-16, null-terminated)
/// - `options_json`: JSON string with connect options (NULL for defaults)
/// - `error`: Out-parameter for error information
///
/// # Options JSON Schema
///
/// ```json
/// {
///   "locale": "MS_409",
///   "blanket": {
///     "authn_service": "win_nt | negotiate | kerberos | default",
///     "authn_level": "default | none | connect | call | packet | packet_integrity | packet_privacy",
///     "impersonation": "default | anonymous | identify | impersonate | delegate"
///   }
/// }
/// ```
///
/// # Returns
///
/// Handle on success, NULL on failure.
///
/// # Safety
///
/// - `namespace` must be a valid null-terminated UTF-16 string or NULL
/// - `options_json` must be a valid UTF-8 string or NULL
/// - `error` must be a valid pointer or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_connect_with_options(
    namespace: *const u16,
    options_json: *const c_char,
    error: *mut WmiFfiError,
) -> *mut WmiServiceHandle {
    unsafe { connect_handle(PlatformRuntime::default(), namespace, options_json, error) }
}

/// Create another handle sharing the same connection.
///
/// The new handle takes its own runtime guard on the calling thread, so this
/// is how a second thread gets access to an existing connection.
///
/// # Returns
///
/// Handle on success, NULL on failure. Free with `wmi_service_close()`.
///
/// # Safety
///
/// - `handle` must be a valid handle or NULL
/// - `error` must be a valid pointer or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_clone(
    handle: *const WmiServiceHandle,
    error: *mut WmiFfiError,
) -> *mut WmiServiceHandle {
    unsafe { clone_handle(handle, error) }
}

/// Close and free a service handle.
///
/// The connection itself is released once every handle sharing it is closed.
///
/// # Safety
///
/// - `handle` must be a valid handle returned by this library, or NULL
/// - The handle must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_service_close(handle: *mut WmiServiceHandle) {
    unsafe { close_handle(handle) }
}
