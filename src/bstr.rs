//! Owned wide strings passed across the service boundary.

use std::fmt;

use crate::object_path::ObjectPath;

/// Owned UTF-16 string handed to the management runtime.
///
/// Slices and Rust strings are copied whole, interior NULs included. Only
/// [`from_wide_ptr`](Self::from_wide_ptr) stops at a terminator. The runtime
/// reads strings up to the first NUL, so callers check
/// [`has_interior_nul`](Self::has_interior_nul) before handing one over.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ComBstr {
    wide: Vec<u16>,
}

impl ComBstr {
    /// Copy wide input as is.
    pub fn from_wide(wide: &[u16]) -> Self {
        Self {
            wide: wide.to_vec(),
        }
    }

    /// Copy a NUL-terminated wide string.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a NUL-terminated UTF-16 buffer.
    pub unsafe fn from_wide_ptr(ptr: *const u16) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }

        let mut len = 0usize;
        unsafe {
            while *ptr.add(len) != 0 {
                len += 1;
            }
            Some(Self::from_wide(std::slice::from_raw_parts(ptr, len)))
        }
    }

    /// The wide buffer, without terminator.
    pub fn as_wide(&self) -> &[u16] {
        &self.wide
    }

    /// Whether the runtime would see a shorter string than this one.
    pub fn has_interior_nul(&self) -> bool {
        self.wide.contains(&0)
    }

    pub fn len(&self) -> usize {
        self.wide.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wide.is_empty()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.wide)
    }

    /// Allocate a runtime-owned `BSTR` for a COM call.
    #[cfg(windows)]
    pub fn to_bstr(&self) -> windows::core::BSTR {
        windows::core::BSTR::from_wide(&self.wide).unwrap_or_default()
    }
}

impl From<&str> for ComBstr {
    fn from(s: &str) -> Self {
        Self {
            wide: s.encode_utf16().collect(),
        }
    }
}

impl From<String> for ComBstr {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&String> for ComBstr {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&[u16]> for ComBstr {
    fn from(wide: &[u16]) -> Self {
        Self::from_wide(wide)
    }
}

impl From<&ObjectPath> for ComBstr {
    fn from(path: &ObjectPath) -> Self {
        Self::from(path.to_string())
    }
}

impl From<ObjectPath> for ComBstr {
    fn from(path: ObjectPath) -> Self {
        Self::from(&path)
    }
}

impl From<&ComBstr> for ComBstr {
    fn from(s: &ComBstr) -> Self {
        s.clone()
    }
}

impl fmt::Display for ComBstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for ComBstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComBstr({:?})", self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slices_keep_interior_nul() {
        let wide: Vec<u16> = "root\\cimv2\0garbage".encode_utf16().collect();
        let bstr = ComBstr::from_wide(&wide);
        assert_eq!(bstr.len(), wide.len());
        assert!(bstr.has_interior_nul());

        let bstr = ComBstr::from("C.K='v'\0,K2='x'");
        assert_eq!(bstr.to_string(), "C.K='v'\0,K2='x'");
        assert!(bstr.has_interior_nul());
        assert!(!ComBstr::from("C.K='v'").has_interior_nul());
    }

    #[test]
    fn test_from_wide_ptr_stops_at_nul() {
        let wide: Vec<u16> = "root\\cimv2\0garbage\0".encode_utf16().collect();
        let bstr = unsafe { ComBstr::from_wide_ptr(wide.as_ptr()) }.unwrap();
        assert_eq!(bstr.to_string(), "root\\cimv2");
        assert_eq!(bstr.len(), 10);
        assert!(!bstr.has_interior_nul());
    }

    #[test]
    fn test_from_wide_ptr() {
        let wide: Vec<u16> = "ROOT\\StandardCimv2\0".encode_utf16().collect();
        let bstr = unsafe { ComBstr::from_wide_ptr(wide.as_ptr()) }.unwrap();
        assert_eq!(bstr, ComBstr::from("ROOT\\StandardCimv2"));

        assert!(unsafe { ComBstr::from_wide_ptr(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_empty() {
        let bstr = ComBstr::from("");
        assert!(bstr.is_empty());
        assert_eq!(bstr.as_wide(), &[] as &[u16]);
    }
}
