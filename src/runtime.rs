//! The management runtime calls a [`WmiService`](crate::WmiService) makes.
//!
//! Every method mirrors one native call: it returns the call's status code
//! and, where the native call has an output parameter, writes the bound
//! interface into an out slot. The service decides what a failure means.

use crate::bstr::ComBstr;
use crate::com_ptr::ComInterface;
use crate::hresult::Hresult;
use crate::options::ProxyBlanket;

/// Arguments to `IWbemLocator::ConnectServer`.
///
/// User, password and authority are always null: connections run as the
/// calling identity against the local machine.
#[derive(Debug, Clone)]
pub struct ConnectRequest<'a> {
    pub namespace: &'a ComBstr,
    pub locale: Option<&'a ComBstr>,
    pub security_flags: i32,
}

/// Flags for asynchronous submission (`WBEM_FLAG_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFlags(pub i32);

impl CallFlags {
    pub const RETURN_IMMEDIATELY: Self = Self(0x10);
}

/// How long `GetCallStatus` may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTimeout {
    /// `WBEM_INFINITE`
    Infinite,
    Millis(u32),
}

impl CallTimeout {
    pub fn as_raw(self) -> i32 {
        match self {
            CallTimeout::Infinite => -1,
            CallTimeout::Millis(ms) => ms.min(i32::MAX as u32) as i32,
        }
    }
}

/// A management runtime backend.
///
/// `Guard` is the per-thread initialization token; it is released when
/// dropped.
pub trait WbemRuntime: Clone {
    type Guard;
    type Locator: ComInterface;
    type Services: ComInterface;
    type Context: ComInterface;
    type CallResult: ComInterface;

    /// Initialize the runtime for the calling thread.
    fn initialize(&self) -> Result<Self::Guard, Hresult>;

    /// Create the locator from the WbemLocator class.
    fn create_locator(&self) -> Result<Self::Locator, Hresult>;

    fn connect_server(
        &self,
        locator: &Self::Locator,
        request: &ConnectRequest<'_>,
        services: &mut Option<Self::Services>,
    ) -> Hresult;

    fn set_proxy_blanket(&self, services: &Self::Services, blanket: &ProxyBlanket) -> Hresult;

    fn delete_instance(
        &self,
        services: &Self::Services,
        object_path: &ComBstr,
        flags: CallFlags,
        context: Option<&Self::Context>,
        call_result: &mut Option<Self::CallResult>,
    ) -> Hresult;

    /// Wait for an asynchronous call and fetch its own status into `status`.
    ///
    /// The returned code reports whether retrieving the status worked.
    fn get_call_status(
        &self,
        call_result: &Self::CallResult,
        timeout: CallTimeout,
        status: &mut Hresult,
    ) -> Hresult;
}
