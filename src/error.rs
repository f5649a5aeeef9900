//! Error handling for the service handle and the FFI layer.
//!
//! [`WmiError`] is what Rust callers see. [`WmiFfiError`] is the C-compatible
//! out-parameter built from it.

use std::ffi::CString;
use std::os::raw::c_char;

use crate::hresult::Hresult;

pub type Result<T> = std::result::Result<T, WmiError>;

/// Which step of the handle's work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The per-thread runtime initialization was refused.
    ComInitialize,
    /// The locator could not be created.
    CreateInstance,
    /// Connecting or configuring the proxy blanket failed.
    Connection,
    /// An asynchronous call could not be submitted.
    CallSubmission,
    /// The completion status of a submitted call could not be retrieved.
    CallCompletion,
    /// The call completed and reported failure.
    CallResult,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ComInitialize => "com-initialize",
            ErrorKind::CreateInstance => "create-instance",
            ErrorKind::Connection => "connection",
            ErrorKind::CallSubmission => "call-submission",
            ErrorKind::CallCompletion => "call-completion",
            ErrorKind::CallResult => "call-result",
        }
    }
}

/// A failed management runtime call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed in {location}: {code}")]
pub struct WmiError {
    kind: ErrorKind,
    code: Hresult,
    operation: &'static str,
    location: &'static str,
    retryable: bool,
}

impl WmiError {
    pub fn new(
        kind: ErrorKind,
        code: Hresult,
        operation: &'static str,
        location: &'static str,
        retryable: bool,
    ) -> Self {
        Self {
            kind,
            code,
            operation,
            location,
            retryable,
        }
    }

    pub fn com_initialize(code: Hresult, location: &'static str) -> Self {
        Self::new(ErrorKind::ComInitialize, code, "CoInitializeEx", location, false)
    }

    pub fn create_instance(code: Hresult, location: &'static str) -> Self {
        Self::new(ErrorKind::CreateInstance, code, "CoCreateInstance", location, false)
    }

    pub fn connection(code: Hresult, operation: &'static str, location: &'static str) -> Self {
        Self::new(ErrorKind::Connection, code, operation, location, false)
    }

    pub fn call_submission(code: Hresult, operation: &'static str, location: &'static str) -> Self {
        Self::new(ErrorKind::CallSubmission, code, operation, location, false)
    }

    pub fn call_completion(code: Hresult, operation: &'static str, location: &'static str) -> Self {
        Self::new(ErrorKind::CallCompletion, code, operation, location, false)
    }

    pub fn call_result(code: Hresult, operation: &'static str, location: &'static str) -> Self {
        Self::new(ErrorKind::CallResult, code, operation, location, false)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> Hresult {
        self.code
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn location(&self) -> &'static str {
        self.location
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Errors raised while building a handle; no handle exists afterwards.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ComInitialize | ErrorKind::CreateInstance | ErrorKind::Connection
        )
    }

    /// Errors raised by the management-call layer rather than connection setup.
    pub fn is_call_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::CallSubmission | ErrorKind::CallCompletion | ErrorKind::CallResult
        )
    }

    /// The call completed and the service reported the object missing.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::CallResult && self.code == Hresult::WBEM_E_NOT_FOUND
    }
}

/// Error codes for FFI functions.
///
/// These codes are stable and can be matched in C code.
/// Codes 1-99 map to [`ErrorKind`] variants.
/// Codes 100+ are FFI-specific errors.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmiErrorCode {
    /// No error
    Ok = 0,

    /// Runtime initialization refused
    ComInitialize = 1,
    /// Locator creation failed
    CreateInstance = 2,
    /// ConnectServer or CoSetProxyBlanket failed
    Connection = 3,
    /// Asynchronous call could not be submitted
    CallSubmission = 4,
    /// Completion status could not be retrieved
    CallCompletion = 5,
    /// Call completed with a failure status
    CallResult = 6,

    // FFI-specific errors (100+)
    /// Null pointer passed
    NullPointer = 100,
    /// Invalid UTF-8 string
    InvalidUtf8 = 101,
    /// JSON parse error
    JsonParse = 102,
    /// Invalid handle
    InvalidHandle = 103,
    /// Logging could not be installed
    Logging = 104,
    /// Unknown error
    Unknown = 255,
}

impl From<ErrorKind> for WmiErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ComInitialize => WmiErrorCode::ComInitialize,
            ErrorKind::CreateInstance => WmiErrorCode::CreateInstance,
            ErrorKind::Connection => WmiErrorCode::Connection,
            ErrorKind::CallSubmission => WmiErrorCode::CallSubmission,
            ErrorKind::CallCompletion => WmiErrorCode::CallCompletion,
            ErrorKind::CallResult => WmiErrorCode::CallResult,
        }
    }
}

/// Error structure returned via out-parameter.
///
/// # Memory Ownership
///
/// The `message` field is owned by the FFI layer when non-null.
/// Call `wmi_error_free()` to release the message memory.
#[repr(C)]
#[derive(Debug)]
pub struct WmiFfiError {
    /// Error code
    pub code: WmiErrorCode,
    /// Native status code (0 when the failure did not come from the runtime)
    pub hresult: i32,
    /// Error message (NULL if code == Ok)
    pub message: *mut c_char,
}

impl WmiFfiError {
    /// Create a success result (no error).
    pub fn ok() -> Self {
        Self {
            code: WmiErrorCode::Ok,
            hresult: 0,
            message: std::ptr::null_mut(),
        }
    }

    fn with_message(code: WmiErrorCode, hresult: i32, msg: String) -> Self {
        Self {
            code,
            hresult,
            message: CString::new(msg)
                .map(CString::into_raw)
                .unwrap_or(std::ptr::null_mut()),
        }
    }

    /// Create an error from a service error.
    pub fn from_wmi_error(e: &WmiError) -> Self {
        Self::with_message(e.kind().into(), e.code().0, e.to_string())
    }

    /// Create a null pointer error.
    pub fn null_pointer(param: &str) -> Self {
        Self::with_message(
            WmiErrorCode::NullPointer,
            0,
            format!("null pointer passed for parameter: {param}"),
        )
    }

    /// Create an invalid UTF-8 error.
    pub fn invalid_utf8(context: &str) -> Self {
        Self::with_message(WmiErrorCode::InvalidUtf8, 0, format!("invalid UTF-8 in {context}"))
    }

    /// Create a JSON parse error.
    pub fn json_parse(e: serde_json::Error) -> Self {
        Self::with_message(WmiErrorCode::JsonParse, 0, format!("JSON parse error: {e}"))
    }

    /// Create an invalid handle error.
    pub fn invalid_handle() -> Self {
        Self::with_message(WmiErrorCode::InvalidHandle, 0, "invalid or null handle".to_string())
    }

    /// Create a logging setup error.
    pub fn logging(e: crate::logging::LoggingError) -> Self {
        Self::with_message(WmiErrorCode::Logging, 0, e.to_string())
    }
}

impl From<WmiError> for WmiFfiError {
    fn from(e: WmiError) -> Self {
        Self::from_wmi_error(&e)
    }
}

/// Free error message memory.
///
/// Safe to call with NULL error or NULL message.
///
/// # Safety
///
/// The error pointer must be valid or NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wmi_error_free(error: *mut WmiFfiError) {
    if error.is_null() {
        return;
    }
    unsafe {
        let err = &mut *error;
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
            err.message = std::ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_display_names_operation_and_location() {
        let e = WmiError::call_result(
            Hresult::WBEM_E_NOT_FOUND,
            "IWbemServices::DeleteInstance",
            "WmiService::delete_path",
        );
        assert_eq!(
            e.to_string(),
            "IWbemServices::DeleteInstance failed in WmiService::delete_path: 0x80041002 (WBEM_E_NOT_FOUND)"
        );
        assert!(e.is_not_found());
        assert!(e.is_call_error());
        assert!(!e.is_construction_error());
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_classification() {
        let connect = WmiError::connection(Hresult::E_ACCESSDENIED, "ConnectServer", "WmiService::connect");
        assert!(connect.is_construction_error());
        assert!(!connect.is_call_error());
        assert!(!connect.is_not_found());

        let submit = WmiError::call_submission(
            Hresult::WBEM_E_NOT_FOUND,
            "IWbemServices::DeleteInstance",
            "WmiService::delete_path",
        );
        // Only a completed call can authoritatively report "not found".
        assert!(!submit.is_not_found());
    }

    #[test]
    fn test_ffi_error_carries_code_and_message() {
        let e = WmiError::com_initialize(Hresult::RPC_E_CHANGED_MODE, "WmiService::connect");
        let mut ffi = WmiFfiError::from_wmi_error(&e);
        assert_eq!(ffi.code, WmiErrorCode::ComInitialize);
        assert_eq!(ffi.hresult, Hresult::RPC_E_CHANGED_MODE.0);

        let msg = unsafe { CStr::from_ptr(ffi.message) }.to_str().unwrap();
        assert!(msg.starts_with("CoInitializeEx failed"));

        unsafe { wmi_error_free(&mut ffi) };
        assert!(ffi.message.is_null());
    }
}
