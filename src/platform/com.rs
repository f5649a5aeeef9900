use std::ffi::c_void;
use std::marker::PhantomData;

use windows::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED, CoCreateInstance, CoInitializeEx,
    CoSetProxyBlanket, CoUninitialize, EOAC_NONE, RPC_C_AUTHN_LEVEL, RPC_C_IMP_LEVEL,
};
use windows::Win32::System::Wmi::{
    IWbemCallResult, IWbemContext, IWbemLocator, IWbemServices, WBEM_GENERIC_FLAG_TYPE,
    WbemLocator,
};
use windows::core::{BSTR, Interface};

use crate::bstr::ComBstr;
use crate::com_ptr::ComInterface;
use crate::hresult::Hresult;
use crate::options::ProxyBlanket;
use crate::runtime::{CallFlags, CallTimeout, ConnectRequest, WbemRuntime};

macro_rules! com_interface {
    ($($iface:ty),* $(,)?) => {
        $(
            impl ComInterface for $iface {
                fn as_raw(&self) -> *mut c_void {
                    Interface::as_raw(self)
                }
            }
        )*
    };
}

com_interface!(IWbemLocator, IWbemServices, IWbemContext, IWbemCallResult);

/// Holds a `CoInitializeEx` reference for the current thread.
///
/// Not `Send`: the matching `CoUninitialize` must run on the same thread.
pub struct ApartmentGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for ApartmentGuard {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}

/// The COM-backed WMI runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComRuntime;

fn status_of(result: windows::core::Result<()>) -> Hresult {
    match result {
        Ok(()) => Hresult::S_OK,
        Err(e) => e.into(),
    }
}

impl WbemRuntime for ComRuntime {
    type Guard = ApartmentGuard;
    type Locator = IWbemLocator;
    type Services = IWbemServices;
    type Context = IWbemContext;
    type CallResult = IWbemCallResult;

    fn initialize(&self) -> Result<ApartmentGuard, Hresult> {
        // S_FALSE (already initialized) still needs a balancing CoUninitialize.
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }.map_err(Hresult::from)?;
        Ok(ApartmentGuard {
            _not_send: PhantomData,
        })
    }

    fn create_locator(&self) -> Result<IWbemLocator, Hresult> {
        unsafe { CoCreateInstance(&WbemLocator, None, CLSCTX_INPROC_SERVER) }.map_err(Hresult::from)
    }

    fn connect_server(
        &self,
        locator: &IWbemLocator,
        request: &ConnectRequest<'_>,
        services: &mut Option<IWbemServices>,
    ) -> Hresult {
        let locale = request.locale.map(ComBstr::to_bstr).unwrap_or_default();
        let result = unsafe {
            locator.ConnectServer(
                &request.namespace.to_bstr(),
                &BSTR::new(),
                &BSTR::new(),
                &locale,
                request.security_flags,
                &BSTR::new(),
                None,
            )
        };
        match result {
            Ok(bound) => {
                *services = Some(bound);
                Hresult::S_OK
            }
            Err(e) => e.into(),
        }
    }

    fn set_proxy_blanket(&self, services: &IWbemServices, blanket: &ProxyBlanket) -> Hresult {
        status_of(unsafe {
            CoSetProxyBlanket(
                services,
                blanket.authn_service.as_raw(),
                ProxyBlanket::AUTHZ_NONE,
                None,
                RPC_C_AUTHN_LEVEL(blanket.authn_level.as_raw()),
                RPC_C_IMP_LEVEL(blanket.impersonation.as_raw()),
                None,
                EOAC_NONE,
            )
        })
    }

    fn delete_instance(
        &self,
        services: &IWbemServices,
        object_path: &ComBstr,
        flags: CallFlags,
        context: Option<&IWbemContext>,
        call_result: &mut Option<IWbemCallResult>,
    ) -> Hresult {
        let path = object_path.to_bstr();
        let flags = WBEM_GENERIC_FLAG_TYPE(flags.0);
        let out = Some(call_result as *mut Option<IWbemCallResult>);
        status_of(unsafe {
            match context {
                Some(ctx) => services.DeleteInstance(&path, flags, ctx, out),
                None => services.DeleteInstance(&path, flags, None, out),
            }
        })
    }

    fn get_call_status(
        &self,
        call_result: &IWbemCallResult,
        timeout: CallTimeout,
        status: &mut Hresult,
    ) -> Hresult {
        match unsafe { call_result.GetCallStatus(timeout.as_raw()) } {
            Ok(code) => {
                *status = Hresult(code);
                Hresult::S_OK
            }
            Err(e) => e.into(),
        }
    }
}
