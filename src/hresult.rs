//! Native status codes returned by the management runtime.

use std::fmt;

/// A COM/WMI status code.
///
/// Negative values are failures, everything else (including the
/// `WBEM_S_*` informational codes) is success.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hresult(pub i32);

impl Hresult {
    pub const S_OK: Self = Self(0);
    pub const S_FALSE: Self = Self(1);
    pub const WBEM_S_TIMEDOUT: Self = Self(0x0004_0004);
    pub const E_NOTIMPL: Self = Self(0x8000_4001_u32 as i32);
    pub const E_POINTER: Self = Self(0x8000_4003_u32 as i32);
    pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
    pub const E_ACCESSDENIED: Self = Self(0x8007_0005_u32 as i32);
    pub const E_INVALIDARG: Self = Self(0x8007_0057_u32 as i32);
    pub const RPC_E_CHANGED_MODE: Self = Self(0x8001_0106_u32 as i32);
    pub const REGDB_E_CLASSNOTREG: Self = Self(0x8004_0154_u32 as i32);
    pub const WBEM_E_FAILED: Self = Self(0x8004_1001_u32 as i32);
    pub const WBEM_E_NOT_FOUND: Self = Self(0x8004_1002_u32 as i32);
    pub const WBEM_E_ACCESS_DENIED: Self = Self(0x8004_1003_u32 as i32);
    pub const WBEM_E_INVALID_NAMESPACE: Self = Self(0x8004_100E_u32 as i32);
    pub const WBEM_E_INVALID_OBJECT_PATH: Self = Self(0x8004_103A_u32 as i32);
    pub const WBEM_E_TRANSPORT_FAILURE: Self = Self(0x8004_1015_u32 as i32);

    /// True for any failure code.
    pub const fn is_failure(self) -> bool {
        self.0 < 0
    }

    pub const fn is_success(self) -> bool {
        !self.is_failure()
    }

    /// Symbolic name for the codes this crate knows about.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::S_OK => "S_OK",
            Self::S_FALSE => "S_FALSE",
            Self::WBEM_S_TIMEDOUT => "WBEM_S_TIMEDOUT",
            Self::E_NOTIMPL => "E_NOTIMPL",
            Self::E_POINTER => "E_POINTER",
            Self::E_FAIL => "E_FAIL",
            Self::E_ACCESSDENIED => "E_ACCESSDENIED",
            Self::E_INVALIDARG => "E_INVALIDARG",
            Self::RPC_E_CHANGED_MODE => "RPC_E_CHANGED_MODE",
            Self::REGDB_E_CLASSNOTREG => "REGDB_E_CLASSNOTREG",
            Self::WBEM_E_FAILED => "WBEM_E_FAILED",
            Self::WBEM_E_NOT_FOUND => "WBEM_E_NOT_FOUND",
            Self::WBEM_E_ACCESS_DENIED => "WBEM_E_ACCESS_DENIED",
            Self::WBEM_E_INVALID_NAMESPACE => "WBEM_E_INVALID_NAMESPACE",
            Self::WBEM_E_INVALID_OBJECT_PATH => "WBEM_E_INVALID_OBJECT_PATH",
            Self::WBEM_E_TRANSPORT_FAILURE => "WBEM_E_TRANSPORT_FAILURE",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Hresult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)?;
        if let Some(name) = self.name() {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hresult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hresult({self})")
    }
}

impl From<i32> for Hresult {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

#[cfg(windows)]
impl From<windows::core::HRESULT> for Hresult {
    fn from(hr: windows::core::HRESULT) -> Self {
        Self(hr.0)
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for Hresult {
    fn from(e: windows::core::Error) -> Self {
        Self(e.code().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_is_sign_bit() {
        assert!(Hresult::WBEM_E_NOT_FOUND.is_failure());
        assert!(Hresult::E_FAIL.is_failure());
        assert!(Hresult::S_OK.is_success());
        assert!(Hresult::S_FALSE.is_success());
        assert!(Hresult::WBEM_S_TIMEDOUT.is_success());
    }

    #[test]
    fn test_display_known_and_unknown() {
        assert_eq!(
            Hresult::WBEM_E_NOT_FOUND.to_string(),
            "0x80041002 (WBEM_E_NOT_FOUND)"
        );
        assert_eq!(Hresult(0x1234).to_string(), "0x00001234");
    }
}
