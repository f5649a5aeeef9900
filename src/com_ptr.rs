//! Reference-counted interface ownership.

use std::ffi::c_void;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A reference-counted interface exposed by the management runtime.
///
/// Cloning adds a reference; dropping releases one. `as_raw` returns the
/// interface pointer and defines identity.
pub trait ComInterface: Clone {
    fn as_raw(&self) -> *mut c_void;
}

/// Shared, non-null reference to a bound interface.
///
/// Equality is identity: two `ComPtr`s are equal when they point at the
/// same interface instance, never by comparing what the interfaces hold.
pub struct ComPtr<T: ComInterface> {
    inner: T,
}

impl<T: ComInterface> ComPtr<T> {
    /// Take ownership of a bound interface reference.
    pub fn new(interface: T) -> Self {
        Self { inner: interface }
    }

    /// Take ownership of whatever a runtime call wrote into an out slot.
    pub fn from_slot(slot: Option<T>) -> Option<Self> {
        slot.map(Self::new)
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.inner.as_raw()
    }
}

impl<T: ComInterface> Clone for ComPtr<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ComInterface> PartialEq for ComPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.as_raw(), other.as_raw())
    }
}

impl<T: ComInterface> Eq for ComPtr<T> {}

impl<T: ComInterface> Deref for ComPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ComInterface> DerefMut for ComPtr<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: ComInterface> fmt::Debug for ComPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComPtr({:p})", self.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone)]
    struct Probe(Arc<u32>);

    impl ComInterface for Probe {
        fn as_raw(&self) -> *mut c_void {
            Arc::as_ptr(&self.0) as *mut c_void
        }
    }

    #[test]
    fn test_clone_shares_identity() {
        let a = ComPtr::new(Probe(Arc::new(7)));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(Arc::strong_count(&a.get().0), 2);
    }

    #[test]
    fn test_equal_contents_are_distinct() {
        let a = ComPtr::new(Probe(Arc::new(7)));
        let b = ComPtr::new(Probe(Arc::new(7)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_slot() {
        assert!(ComPtr::<Probe>::from_slot(None).is_none());
        let bound = ComPtr::from_slot(Some(Probe(Arc::new(1)))).unwrap();
        assert_eq!(*bound.get().0, 1);
    }
}
