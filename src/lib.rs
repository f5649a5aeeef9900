//! Guarded connections to the local WMI service, with C FFI bindings.
//!
//! [`WmiService`] owns everything a WMI call needs: the per-thread runtime
//! initialization, the locator, and a service proxy with its security
//! blanket set. Copies share the connection; [`WmiService::delete_path`]
//! submits an asynchronous deletion and blocks until it completes.
//!
//! The same handle is exposed to C through `wmi_service_*` functions.
//!
//! # Thread Safety
//!
//! `WmiService` and `WmiServiceHandle` are NOT `Send` or `Sync`. A handle
//! holds a runtime guard for the thread that created it; other threads must
//! create or clone their own.
//!
//! # Memory Management
//!
//! - Handles returned by `wmi_service_connect*`/`wmi_service_clone` must be freed with `wmi_service_close`
//! - Error messages must be freed with `wmi_error_free`
//!
//! # Platforms
//!
//! On Windows the handle talks to WMI through COM. On other targets every
//! connection attempt fails with `E_NOTIMPL`. The `mock` feature adds an
//! in-memory runtime for testing code built on this crate.

#![allow(clippy::missing_safety_doc)]

mod access;
mod bstr;
mod com_ptr;
mod error;
mod handle;
mod hresult;
mod lifecycle;
pub mod logging;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod mutation;
mod object_path;
mod options;
mod platform;
mod runtime;
mod service;
mod util;

// Re-export the Rust API
pub use bstr::ComBstr;
pub use com_ptr::{ComInterface, ComPtr};
pub use error::{ErrorKind, Result, WmiError};
pub use hresult::Hresult;
pub use object_path::{ObjectPath, ObjectPathError};
pub use options::{AuthnLevel, AuthnService, ConnectOptions, ImpersonationLevel, ProxyBlanket};
pub use platform::PlatformRuntime;
#[cfg(windows)]
pub use platform::ApartmentGuard;
#[cfg(not(windows))]
pub use platform::Unavailable;
pub use runtime::{CallFlags, CallTimeout, ConnectRequest, WbemRuntime};
pub use service::WmiService;

// Re-export all public FFI types and functions
pub use access::{equal_handles, raw_services, wmi_service_equal, wmi_service_raw};
pub use error::{wmi_error_free, WmiErrorCode, WmiFfiError};
pub use handle::WmiServiceHandle;
pub use lifecycle::{
    clone_handle, close_handle, connect_handle, wmi_service_clone, wmi_service_close,
    wmi_service_connect, wmi_service_connect_with_options,
};
pub use mutation::{assign_handle, delete_path_handle, wmi_service_assign, wmi_service_delete_path};

use libc::c_int;
use std::os::raw::c_char;

/// Library version string.
///
/// # Returns
///
/// Static string containing the version (e.g., "0.1.0").
/// Do not free this string.
#[unsafe(no_mangle)]
pub extern "C" fn wmi_version() -> *const c_char {
    // Include null terminator in the static string
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Feature flags bitmask.
///
/// # Returns
///
/// - Bit 0 (0x01): a native WMI runtime is available (Windows builds)
/// - Bit 1 (0x02): the in-memory `mock` runtime is compiled in
#[unsafe(no_mangle)]
pub extern "C" fn wmi_features() -> u32 {
    let mut flags = 0u32;

    #[cfg(windows)]
    {
        flags |= 1 << 0;
    }

    #[cfg(feature = "mock")]
    {
        flags |= 1 << 1;
    }

    flags
}

/// Install a stderr log subscriber.
///
/// # Parameters
///
/// - `filter`: `tracing` filter directives such as `wmi_service=debug`
///   (UTF-8, NULL to read `WMI_SERVICE_LOG` or use `wmi_service=info`)
/// - `error`: Out-parameter for error information
///
/// # Returns
///
/// 1 on success, 0 on failure (including when a subscriber already exists).
///
/// # Safety
///
/// - `filter` must be a valid null-terminated UTF-8 string or NULL
/// - `error` must be a valid pointer or NULL
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_log_init(filter: *const c_char, error: *mut WmiFfiError) -> c_int {
    let filter = match unsafe { util::cstr_to_option_string(filter, "filter") } {
        Ok(f) => f,
        Err(e) => return unsafe { util::set_error(error, e) },
    };

    match logging::init_logging(filter.as_deref()) {
        Ok(()) => {
            unsafe { util::set_ok(error) };
            1
        }
        Err(e) => unsafe { util::set_error(error, WmiFfiError::logging(e)) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFault, MockRuntime};
    use std::ffi::{CStr, CString};

    const NS: &str = "ROOT\\StandardCimv2";
    const RULE: &str = "MSFT_NetFirewallRule.InstanceID='{4fe1f1a5}'";

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    fn message(error: &WmiFfiError) -> String {
        if error.message.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(error.message) }
            .to_str()
            .unwrap()
            .to_string()
    }

    fn runtime() -> MockRuntime {
        let runtime = MockRuntime::new().with_namespace(NS);
        runtime.add_instance(NS, RULE);
        runtime
    }

    #[test]
    fn test_version() {
        let version = wmi_version();
        assert!(!version.is_null());
        let version_str = unsafe { CStr::from_ptr(version) };
        assert_eq!(version_str.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_features() {
        let features = wmi_features();
        #[cfg(windows)]
        assert!(features & 0x01 != 0);
        #[cfg(not(windows))]
        assert_eq!(features & 0x01, 0);
    }

    #[test]
    fn test_connect_null_namespace() {
        let mut error = WmiFfiError::ok();
        let handle = unsafe { wmi_service_connect(std::ptr::null(), &mut error) };
        assert!(handle.is_null());
        assert_eq!(error.code, WmiErrorCode::NullPointer);
        assert!(message(&error).contains("namespace"));
        unsafe { wmi_error_free(&mut error) };
        assert!(error.message.is_null());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_platform_connect_fails_off_windows() {
        let ns = wide("root\\cimv2");
        let mut error = WmiFfiError::ok();
        let handle = unsafe { wmi_service_connect(ns.as_ptr(), &mut error) };
        assert!(handle.is_null());
        assert_eq!(error.code, WmiErrorCode::ComInitialize);
        assert_eq!(error.hresult, Hresult::E_NOTIMPL.0);
        unsafe { wmi_error_free(&mut error) };
    }

    #[test]
    fn test_connect_clone_equal_close() {
        let runtime = runtime();
        let ns = wide(NS);
        let mut error = WmiFfiError::ok();

        let a = unsafe { connect_handle(runtime.clone(), ns.as_ptr(), std::ptr::null(), &mut error) };
        assert!(!a.is_null());
        assert_eq!(error.code, WmiErrorCode::Ok);

        let b = unsafe { clone_handle(a, &mut error) };
        assert!(!b.is_null());
        assert_eq!(unsafe { equal_handles(a, b) }, 1);
        assert_eq!(unsafe { raw_services(a) }, unsafe { raw_services(b) });
        assert!(!unsafe { raw_services(a) }.is_null());

        let c = unsafe { connect_handle(runtime.clone(), ns.as_ptr(), std::ptr::null(), &mut error) };
        assert!(!c.is_null());
        assert_eq!(unsafe { equal_handles(a, c) }, 0);
        assert_eq!(unsafe { equal_handles(a, std::ptr::null()) }, 0);

        unsafe {
            close_handle(a);
            close_handle(b);
            close_handle(c);
        }
        assert_eq!(runtime.live_connections(), 0);
        assert_eq!(runtime.guards_active(), 0);
    }

    #[test]
    fn test_connect_invalid_namespace() {
        let runtime = runtime();
        let ns = wide("ROOT\\Nowhere");
        let mut error = WmiFfiError::ok();

        let handle = unsafe { connect_handle(runtime, ns.as_ptr(), std::ptr::null(), &mut error) };
        assert!(handle.is_null());
        assert_eq!(error.code, WmiErrorCode::Connection);
        assert_eq!(error.hresult, Hresult::WBEM_E_INVALID_NAMESPACE.0);
        assert!(message(&error).starts_with("ConnectServer failed in WmiService::connect"));
        unsafe { wmi_error_free(&mut error) };
    }

    #[test]
    fn test_connect_with_options_json() {
        let runtime = runtime();
        let ns = wide(NS);
        let mut error = WmiFfiError::ok();

        let options = CString::new(r#"{"locale": "MS_409"}"#).unwrap();
        let handle =
            unsafe { connect_handle(runtime.clone(), ns.as_ptr(), options.as_ptr(), &mut error) };
        assert!(!handle.is_null());
        assert_eq!(runtime.locales(), vec![Some("MS_409".to_string())]);
        unsafe { close_handle(handle) };

        let bad = CString::new(r#"{"locale": 409}"#).unwrap();
        let handle = unsafe { connect_handle(runtime, ns.as_ptr(), bad.as_ptr(), &mut error) };
        assert!(handle.is_null());
        assert_eq!(error.code, WmiErrorCode::JsonParse);
        unsafe { wmi_error_free(&mut error) };
    }

    #[test]
    fn test_delete_path_twice() {
        let runtime = runtime();
        let ns = wide(NS);
        let path = wide(RULE);
        let mut error = WmiFfiError::ok();

        let handle = unsafe { connect_handle(runtime.clone(), ns.as_ptr(), std::ptr::null(), &mut error) };
        assert!(!handle.is_null());

        let ok = unsafe { delete_path_handle(handle, path.as_ptr(), &mut error) };
        assert_eq!(ok, 1);
        assert_eq!(error.code, WmiErrorCode::Ok);
        assert!(!runtime.contains_instance(NS, RULE));

        let ok = unsafe { delete_path_handle(handle, path.as_ptr(), &mut error) };
        assert_eq!(ok, 0);
        assert_eq!(error.code, WmiErrorCode::CallResult);
        assert_eq!(error.hresult, Hresult::WBEM_E_NOT_FOUND.0);
        unsafe { wmi_error_free(&mut error) };

        unsafe { close_handle(handle) };
    }

    #[test]
    fn test_delete_path_argument_errors() {
        let runtime = runtime();
        let ns = wide(NS);
        let path = wide(RULE);
        let mut error = WmiFfiError::ok();

        let ok = unsafe {
            delete_path_handle::<MockRuntime>(std::ptr::null(), path.as_ptr(), &mut error)
        };
        assert_eq!(ok, 0);
        assert_eq!(error.code, WmiErrorCode::InvalidHandle);
        unsafe { wmi_error_free(&mut error) };

        let handle = unsafe { connect_handle(runtime.clone(), ns.as_ptr(), std::ptr::null(), &mut error) };
        let ok = unsafe { delete_path_handle(handle, std::ptr::null(), &mut error) };
        assert_eq!(ok, 0);
        assert_eq!(error.code, WmiErrorCode::NullPointer);
        unsafe { wmi_error_free(&mut error) };

        runtime.set_fault(MockFault::DeleteInstance, Hresult::WBEM_E_ACCESS_DENIED);
        let ok = unsafe { delete_path_handle(handle, path.as_ptr(), &mut error) };
        assert_eq!(ok, 0);
        assert_eq!(error.code, WmiErrorCode::CallSubmission);
        assert_eq!(error.hresult, Hresult::WBEM_E_ACCESS_DENIED.0);
        unsafe { wmi_error_free(&mut error) };
        assert!(runtime.contains_instance(NS, RULE));

        unsafe { close_handle(handle) };
    }

    #[test]
    fn test_assign() {
        let runtime = runtime();
        let ns = wide(NS);
        let mut error = WmiFfiError::ok();

        let a = unsafe { connect_handle(runtime.clone(), ns.as_ptr(), std::ptr::null(), &mut error) };
        let b = unsafe { connect_handle(runtime.clone(), ns.as_ptr(), std::ptr::null(), &mut error) };
        assert_eq!(unsafe { equal_handles(a, b) }, 0);

        assert_eq!(unsafe { assign_handle(a, a, &mut error) }, 1);
        assert_eq!(unsafe { assign_handle(a, b, &mut error) }, 1);
        assert_eq!(error.code, WmiErrorCode::Ok);
        assert_eq!(unsafe { equal_handles(a, b) }, 1);
        // The first connection was only referenced by `a`.
        assert_eq!(runtime.live_connections(), 1);

        assert_eq!(unsafe { assign_handle(a, std::ptr::null(), &mut error) }, 0);
        assert_eq!(error.code, WmiErrorCode::InvalidHandle);
        unsafe { wmi_error_free(&mut error) };

        unsafe {
            close_handle(a);
            close_handle(b);
        }
    }

    #[test]
    fn test_log_init_rejects_bad_utf8() {
        let bytes = [0xffu8, 0xfe, 0x00];
        let mut error = WmiFfiError::ok();
        let ok = unsafe { wmi_log_init(bytes.as_ptr() as *const c_char, &mut error) };
        assert_eq!(ok, 0);
        assert_eq!(error.code, WmiErrorCode::InvalidUtf8);
        unsafe { wmi_error_free(&mut error) };
    }
}
