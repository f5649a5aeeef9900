//! The guarded WMI connection handle.

use std::ffi::c_void;
use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::bstr::ComBstr;
use crate::com_ptr::ComPtr;
use crate::error::{Result, WmiError};
use crate::hresult::Hresult;
use crate::options::ConnectOptions;
use crate::platform::PlatformRuntime;
use crate::runtime::{CallFlags, CallTimeout, ConnectRequest, WbemRuntime};

const CONNECT: &str = "WmiService::connect";
const CLONE: &str = "WmiService::clone";
const DELETE_PATH: &str = "WmiService::delete_path";

/// A connection to one WMI namespace.
///
/// Construction initializes the runtime for the calling thread, creates a
/// locator, connects to the namespace and sets the proxy security blanket.
/// Either all of that succeeds or no handle is produced.
///
/// Copies made with [`try_clone`](Self::try_clone) share the connection and
/// compare equal; handles connected separately never do, even to the same
/// namespace.
///
/// # Thread Safety
///
/// The handle owns a per-thread runtime guard and is not `Send`. A thread
/// that needs the connection must hold its own handle.
///
/// # Blocking
///
/// [`delete_path`](Self::delete_path) waits for completion without a
/// timeout. A service that never answers hangs the calling thread.
pub struct WmiService<R: WbemRuntime = PlatformRuntime> {
    runtime: R,
    locator: ComPtr<R::Locator>,
    services: ComPtr<R::Services>,
    // Declared last: the interface references must be released before the
    // thread's runtime reference.
    _guard: R::Guard,
}

impl WmiService<PlatformRuntime> {
    /// Connect to `namespace` (for example `root\cimv2`) on the local machine.
    pub fn new(namespace: impl Into<ComBstr>) -> Result<Self> {
        Self::connect(PlatformRuntime::default(), namespace)
    }
}

impl<R: WbemRuntime> WmiService<R> {
    /// Connect to `namespace` through `runtime` with the default blanket.
    pub fn connect(runtime: R, namespace: impl Into<ComBstr>) -> Result<Self> {
        Self::connect_with_options(runtime, namespace, &ConnectOptions::default())
    }

    /// Connect to `namespace` through `runtime` with a locale and blanket.
    ///
    /// A namespace or locale with an embedded NUL is rejected with
    /// `E_INVALIDARG` before the runtime is touched.
    pub fn connect_with_options(
        runtime: R,
        namespace: impl Into<ComBstr>,
        options: &ConnectOptions,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let locale = options.locale.as_deref().map(ComBstr::from);
        let locale_has_nul = locale.as_ref().is_some_and(ComBstr::has_interior_nul);
        if namespace.has_interior_nul() || locale_has_nul {
            return Err(WmiError::connection(Hresult::E_INVALIDARG, "ConnectServer", CONNECT));
        }

        let guard = runtime
            .initialize()
            .map_err(|hr| WmiError::com_initialize(hr, CONNECT))?;

        let locator = runtime
            .create_locator()
            .map(ComPtr::new)
            .map_err(|hr| WmiError::create_instance(hr, CONNECT))?;

        let request = ConnectRequest {
            namespace: &namespace,
            locale: locale.as_ref(),
            security_flags: ConnectOptions::SECURITY_FLAGS,
        };
        let mut slot = None;
        let hr = runtime.connect_server(locator.get(), &request, &mut slot);
        if hr.is_failure() {
            warn!(namespace = %namespace, hresult = %hr, "ConnectServer failed");
            return Err(WmiError::connection(hr, "ConnectServer", CONNECT));
        }
        let services = ComPtr::from_slot(slot)
            .ok_or_else(|| WmiError::connection(Hresult::E_POINTER, "ConnectServer", CONNECT))?;

        let hr = runtime.set_proxy_blanket(services.get(), &options.blanket);
        if hr.is_failure() {
            warn!(namespace = %namespace, hresult = %hr, "CoSetProxyBlanket failed");
            return Err(WmiError::connection(hr, "CoSetProxyBlanket", CONNECT));
        }

        debug!(namespace = %namespace, services = ?services, "connected to WMI namespace");
        Ok(Self {
            runtime,
            locator,
            services,
            _guard: guard,
        })
    }

    /// Make another handle to the same connection.
    ///
    /// The copy takes its own runtime guard, which can fail.
    pub fn try_clone(&self) -> Result<Self> {
        let guard = self
            .runtime
            .initialize()
            .map_err(|hr| WmiError::com_initialize(hr, CLONE))?;
        Ok(Self {
            runtime: self.runtime.clone(),
            locator: self.locator.clone(),
            services: self.services.clone(),
            _guard: guard,
        })
    }

    /// Point this handle at `other`'s connection.
    ///
    /// On failure `self` is left untouched.
    pub fn assign(&mut self, other: &Self) -> Result<()> {
        let mut temp = other.try_clone()?;
        std::mem::swap(&mut self.runtime, &mut temp.runtime);
        std::mem::swap(&mut self.locator, &mut temp.locator);
        std::mem::swap(&mut self.services, &mut temp.services);
        Ok(())
    }

    /// The bound service interface.
    pub fn get(&self) -> &R::Services {
        self.services.get()
    }

    /// The bound service interface, mutably.
    pub fn get_mut(&mut self) -> &mut R::Services {
        self.services.get_mut()
    }

    /// The shared reference to the bound service.
    pub fn services(&self) -> &ComPtr<R::Services> {
        &self.services
    }

    /// The raw service interface pointer, for handing to native code.
    pub fn as_raw(&self) -> *mut c_void {
        self.services.as_raw()
    }

    /// Delete the object at `object_path`, e.g.
    /// `MyClass.MyProperty1='33',MyProperty2='value'`.
    pub fn delete_path(&self, object_path: impl Into<ComBstr>) -> Result<()> {
        self.delete_path_with_context(object_path, None)
    }

    /// Delete the object at `object_path`, passing a call context.
    ///
    /// The call is submitted asynchronously and then waited on without a
    /// timeout. Submission failure, failure to read the completion status,
    /// and a failed completion are reported as distinct error kinds.
    pub fn delete_path_with_context(
        &self,
        object_path: impl Into<ComBstr>,
        context: Option<&ComPtr<R::Context>>,
    ) -> Result<()> {
        let object_path = object_path.into();
        if object_path.has_interior_nul() {
            return Err(WmiError::call_submission(
                Hresult::E_INVALIDARG,
                "IWbemServices::DeleteInstance",
                DELETE_PATH,
            ));
        }

        let mut slot = None;
        let hr = self.runtime.delete_instance(
            self.services.get(),
            &object_path,
            CallFlags::RETURN_IMMEDIATELY,
            context.map(ComPtr::get),
            &mut slot,
        );
        if hr.is_failure() {
            warn!(path = %object_path, hresult = %hr, "DeleteInstance submission failed");
            return Err(WmiError::call_submission(
                hr,
                "IWbemServices::DeleteInstance",
                DELETE_PATH,
            ));
        }
        let call_result = ComPtr::from_slot(slot).ok_or_else(|| {
            WmiError::call_submission(Hresult::E_POINTER, "IWbemServices::DeleteInstance", DELETE_PATH)
        })?;

        // Only a status the runtime actually wrote can report success.
        let mut status = Hresult::WBEM_E_FAILED;
        let hr = self
            .runtime
            .get_call_status(call_result.get(), CallTimeout::Infinite, &mut status);
        if hr.is_failure() {
            warn!(path = %object_path, hresult = %hr, "GetCallStatus failed");
            return Err(WmiError::call_completion(
                hr,
                "IWbemCallResult::GetCallStatus",
                DELETE_PATH,
            ));
        }
        if status.is_failure() {
            debug!(path = %object_path, hresult = %status, "DeleteInstance completed with failure");
            return Err(WmiError::call_result(
                status,
                "IWbemServices::DeleteInstance",
                DELETE_PATH,
            ));
        }

        debug!(path = %object_path, "deleted WMI object");
        Ok(())
    }
}

impl<R: WbemRuntime> PartialEq for WmiService<R> {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator && self.services == other.services
    }
}

impl<R: WbemRuntime> Eq for WmiService<R> {}

impl<R: WbemRuntime> Deref for WmiService<R> {
    type Target = R::Services;

    fn deref(&self) -> &R::Services {
        self.get()
    }
}

impl<R: WbemRuntime> DerefMut for WmiService<R> {
    fn deref_mut(&mut self) -> &mut R::Services {
        self.get_mut()
    }
}

impl<R: WbemRuntime> fmt::Debug for WmiService<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WmiService")
            .field("locator", &self.locator)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}
