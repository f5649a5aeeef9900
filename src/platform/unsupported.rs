use std::ffi::c_void;

use crate::bstr::ComBstr;
use crate::com_ptr::ComInterface;
use crate::hresult::Hresult;
use crate::options::ProxyBlanket;
use crate::runtime::{CallFlags, CallTimeout, ConnectRequest, WbemRuntime};

/// An interface that can never be obtained on this platform.
#[derive(Debug, Clone)]
pub enum Unavailable {}

impl ComInterface for Unavailable {
    fn as_raw(&self) -> *mut c_void {
        match *self {}
    }
}

/// Runtime for targets without COM. Initialization always fails with
/// `E_NOTIMPL`, so no handle is ever built.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedRuntime;

impl WbemRuntime for UnsupportedRuntime {
    type Guard = ();
    type Locator = Unavailable;
    type Services = Unavailable;
    type Context = Unavailable;
    type CallResult = Unavailable;

    fn initialize(&self) -> Result<(), Hresult> {
        Err(Hresult::E_NOTIMPL)
    }

    fn create_locator(&self) -> Result<Unavailable, Hresult> {
        Err(Hresult::E_NOTIMPL)
    }

    fn connect_server(
        &self,
        locator: &Unavailable,
        _request: &ConnectRequest<'_>,
        _services: &mut Option<Unavailable>,
    ) -> Hresult {
        match *locator {}
    }

    fn set_proxy_blanket(&self, services: &Unavailable, _blanket: &ProxyBlanket) -> Hresult {
        match *services {}
    }

    fn delete_instance(
        &self,
        services: &Unavailable,
        _object_path: &ComBstr,
        _flags: CallFlags,
        _context: Option<&Unavailable>,
        _call_result: &mut Option<Unavailable>,
    ) -> Hresult {
        match *services {}
    }

    fn get_call_status(
        &self,
        call_result: &Unavailable,
        _timeout: CallTimeout,
        _status: &mut Hresult,
    ) -> Hresult {
        match *call_result {}
    }
}
