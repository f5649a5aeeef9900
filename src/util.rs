//! Utility functions for FFI operations.

use crate::bstr::ComBstr;
use crate::error::WmiFfiError;
use std::ffi::CStr;
use std::os::raw::c_char;

/// Copy a NUL-terminated UTF-16 string.
///
/// Returns an error if the pointer is null.
///
/// # Safety
///
/// The caller must ensure `ptr` is either null or points to a valid
/// NUL-terminated UTF-16 string.
pub unsafe fn wstr_to_bstr(ptr: *const u16, param_name: &str) -> Result<ComBstr, WmiFfiError> {
    unsafe { ComBstr::from_wide_ptr(ptr) }.ok_or_else(|| WmiFfiError::null_pointer(param_name))
}

/// Convert an optional C string to an Option<String>.
///
/// Returns None if the pointer is null, Ok(Some(String)) if valid,
/// or an error if the string contains invalid UTF-8.
///
/// # Safety
///
/// The caller must ensure `ptr` is either null or points to a valid
/// null-terminated C string.
pub unsafe fn cstr_to_option_string(
    ptr: *const c_char,
    param_name: &str,
) -> Result<Option<String>, WmiFfiError> {
    if ptr.is_null() {
        return Ok(None);
    }

    let cstr = unsafe { CStr::from_ptr(ptr) };
    match cstr.to_str() {
        Ok(s) => Ok(Some(s.to_string())),
        Err(_) => Err(WmiFfiError::invalid_utf8(param_name)),
    }
}

/// Set an error in the out-parameter and return a default value.
///
/// # Safety
///
/// The caller must ensure `error` is either null or a valid pointer.
pub unsafe fn set_error<T: Default>(error: *mut WmiFfiError, err: WmiFfiError) -> T {
    if let Some(e) = unsafe { error.as_mut() } {
        *e = err;
    }
    T::default()
}

/// Set an error in the out-parameter and return null.
///
/// # Safety
///
/// The caller must ensure `error` is either null or a valid pointer.
pub unsafe fn set_error_null<T>(error: *mut WmiFfiError, err: WmiFfiError) -> *mut T {
    if let Some(e) = unsafe { error.as_mut() } {
        *e = err;
    }
    std::ptr::null_mut()
}

/// Set success in the out-parameter error.
///
/// # Safety
///
/// The caller must ensure `error` is either null or a valid pointer.
pub unsafe fn set_ok(error: *mut WmiFfiError) {
    if let Some(e) = unsafe { error.as_mut() } {
        *e = WmiFfiError::ok();
    }
}
