//! Opaque handle wrapper for service connections.

use crate::platform::PlatformRuntime;
use crate::runtime::WbemRuntime;
use crate::service::WmiService;

/// Opaque handle to a [`WmiService`].
///
/// This struct owns the underlying service and is exposed to C as an opaque
/// pointer. The handle must be freed with `wmi_service_close()`.
///
/// # Thread Safety
///
/// The service holds a per-thread runtime guard. A handle must be used and
/// closed on the thread that created it; use `wmi_service_clone()` on
/// another thread to get a handle of its own.
pub struct WmiServiceHandle<R: WbemRuntime = PlatformRuntime> {
    inner: WmiService<R>,
}

impl<R: WbemRuntime> WmiServiceHandle<R> {
    /// Create a new handle wrapping a service.
    pub fn new(service: WmiService<R>) -> Box<Self> {
        Box::new(Self { inner: service })
    }

    pub fn service(&self) -> &WmiService<R> {
        &self.inner
    }

    pub fn service_mut(&mut self) -> &mut WmiService<R> {
        &mut self.inner
    }

    /// Convert a raw pointer to a shared reference.
    ///
    /// # Safety
    ///
    /// The pointer must be null or a live handle.
    pub unsafe fn from_ptr<'a>(ptr: *const WmiServiceHandle<R>) -> Option<&'a Self> {
        unsafe { ptr.as_ref() }
    }

    /// Convert a raw pointer to a mutable reference.
    ///
    /// # Safety
    ///
    /// The pointer must be null or a live handle not aliased elsewhere.
    pub unsafe fn from_ptr_mut<'a>(ptr: *mut WmiServiceHandle<R>) -> Option<&'a mut Self> {
        unsafe { ptr.as_mut() }
    }
}
