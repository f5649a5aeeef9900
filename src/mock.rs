//! In-memory management runtime for tests.
//!
//! Namespaces hold sets of object paths. Every runtime call can be made to
//! fail with a chosen code, and deletions can be completed after a delay on
//! a background thread to exercise the blocking wait.

use std::collections::{BTreeSet, HashMap};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::bstr::ComBstr;
use crate::com_ptr::ComInterface;
use crate::hresult::Hresult;
use crate::object_path::ObjectPath;
use crate::options::ProxyBlanket;
use crate::runtime::{CallFlags, CallTimeout, ConnectRequest, WbemRuntime};

/// Runtime calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFault {
    Initialize,
    CreateLocator,
    ConnectServer,
    SetProxyBlanket,
    DeleteInstance,
    GetCallStatus,
}

type Instances = Arc<Mutex<BTreeSet<String>>>;

#[derive(Default)]
struct MockState {
    namespaces: Mutex<HashMap<String, Instances>>,
    faults: Mutex<HashMap<MockFault, Hresult>>,
    completion_delay: Mutex<Option<Duration>>,
    status_unwritten: AtomicBool,
    blankets: Mutex<Vec<ProxyBlanket>>,
    locales: Mutex<Vec<Option<String>>>,
    contexts_seen: AtomicUsize,
    guards_acquired: AtomicUsize,
    guards_active: AtomicUsize,
    connections: AtomicUsize,
    live_connections: Arc<AtomicUsize>,
}

fn namespace_key(namespace: &str) -> String {
    namespace.replace('/', "\\").to_ascii_lowercase()
}

fn instance_key(path: &ObjectPath) -> String {
    path.canonical()
}

/// Shared, cloneable mock runtime. Clones see the same namespaces.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace so ConnectServer accepts it.
    pub fn with_namespace(self, namespace: &str) -> Self {
        self.state
            .namespaces
            .lock()
            .entry(namespace_key(namespace))
            .or_default();
        self
    }

    /// Add an instance, creating the namespace if needed.
    ///
    /// # Panics
    ///
    /// Panics if `object_path` does not parse; this is test setup.
    pub fn add_instance(&self, namespace: &str, object_path: &str) {
        let path: ObjectPath = object_path.parse().expect("valid object path");
        let instances = self
            .state
            .namespaces
            .lock()
            .entry(namespace_key(namespace))
            .or_default()
            .clone();
        instances.lock().insert(instance_key(&path));
    }

    pub fn contains_instance(&self, namespace: &str, object_path: &str) -> bool {
        let Ok(path) = object_path.parse::<ObjectPath>() else {
            return false;
        };
        self.state
            .namespaces
            .lock()
            .get(&namespace_key(namespace))
            .is_some_and(|instances| instances.lock().contains(&instance_key(&path)))
    }

    pub fn set_fault(&self, fault: MockFault, code: Hresult) {
        self.state.faults.lock().insert(fault, code);
    }

    pub fn clear_fault(&self, fault: MockFault) {
        self.state.faults.lock().remove(&fault);
    }

    /// Complete deletions on a background thread after `delay`.
    pub fn set_completion_delay(&self, delay: Option<Duration>) {
        *self.state.completion_delay.lock() = delay;
    }

    /// Make GetCallStatus succeed without writing the call's status.
    pub fn set_status_unwritten(&self, unwritten: bool) {
        self.state.status_unwritten.store(unwritten, Ordering::SeqCst);
    }

    /// Blankets applied so far, in order.
    pub fn blankets(&self) -> Vec<ProxyBlanket> {
        self.state.blankets.lock().clone()
    }

    /// Locales passed to ConnectServer so far, in order.
    pub fn locales(&self) -> Vec<Option<String>> {
        self.state.locales.lock().clone()
    }

    /// Number of deletions submitted with a non-null context.
    pub fn contexts_seen(&self) -> usize {
        self.state.contexts_seen.load(Ordering::SeqCst)
    }

    pub fn guards_acquired(&self) -> usize {
        self.state.guards_acquired.load(Ordering::SeqCst)
    }

    pub fn guards_active(&self) -> usize {
        self.state.guards_active.load(Ordering::SeqCst)
    }

    /// Successful ConnectServer calls.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Service proxies still referenced by someone.
    pub fn live_connections(&self) -> usize {
        self.state.live_connections.load(Ordering::SeqCst)
    }

    /// A call context to pass to `delete_path_with_context`.
    pub fn context(&self) -> MockContext {
        MockContext(Arc::new(()))
    }

    fn fault(&self, fault: MockFault) -> Option<Hresult> {
        self.state.faults.lock().get(&fault).copied()
    }
}

/// Per-thread initialization token. Not `Send`.
pub struct MockGuard {
    state: Arc<MockState>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        self.state.guards_active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct MockLocator(Arc<()>);

impl ComInterface for MockLocator {
    fn as_raw(&self) -> *mut c_void {
        Arc::as_ptr(&self.0) as *mut c_void
    }
}

struct Proxy {
    instances: Instances,
    live: Arc<AtomicUsize>,
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct MockServices(Arc<Proxy>);

impl ComInterface for MockServices {
    fn as_raw(&self) -> *mut c_void {
        Arc::as_ptr(&self.0) as *mut c_void
    }
}

#[derive(Clone)]
pub struct MockContext(Arc<()>);

impl ComInterface for MockContext {
    fn as_raw(&self) -> *mut c_void {
        Arc::as_ptr(&self.0) as *mut c_void
    }
}

#[derive(Default)]
struct Completion {
    status: Mutex<Option<Hresult>>,
    done: Condvar,
}

impl Completion {
    fn complete(&self, status: Hresult) {
        *self.status.lock() = Some(status);
        self.done.notify_all();
    }
}

#[derive(Clone)]
pub struct MockCallResult(Arc<Completion>);

impl ComInterface for MockCallResult {
    fn as_raw(&self) -> *mut c_void {
        Arc::as_ptr(&self.0) as *mut c_void
    }
}

fn delete_from(instances: &Instances, key: &str) -> Hresult {
    if instances.lock().remove(key) {
        Hresult::S_OK
    } else {
        Hresult::WBEM_E_NOT_FOUND
    }
}

impl WbemRuntime for MockRuntime {
    type Guard = MockGuard;
    type Locator = MockLocator;
    type Services = MockServices;
    type Context = MockContext;
    type CallResult = MockCallResult;

    fn initialize(&self) -> Result<MockGuard, Hresult> {
        if let Some(code) = self.fault(MockFault::Initialize) {
            return Err(code);
        }
        self.state.guards_acquired.fetch_add(1, Ordering::SeqCst);
        self.state.guards_active.fetch_add(1, Ordering::SeqCst);
        Ok(MockGuard {
            state: self.state.clone(),
            _not_send: PhantomData,
        })
    }

    fn create_locator(&self) -> Result<MockLocator, Hresult> {
        match self.fault(MockFault::CreateLocator) {
            Some(code) => Err(code),
            None => Ok(MockLocator(Arc::new(()))),
        }
    }

    fn connect_server(
        &self,
        _locator: &MockLocator,
        request: &ConnectRequest<'_>,
        services: &mut Option<MockServices>,
    ) -> Hresult {
        self.state
            .locales
            .lock()
            .push(request.locale.map(ComBstr::to_string_lossy));
        if let Some(code) = self.fault(MockFault::ConnectServer) {
            return code;
        }

        let key = namespace_key(&request.namespace.to_string_lossy());
        let Some(instances) = self.state.namespaces.lock().get(&key).cloned() else {
            return Hresult::WBEM_E_INVALID_NAMESPACE;
        };

        self.state.connections.fetch_add(1, Ordering::SeqCst);
        self.state.live_connections.fetch_add(1, Ordering::SeqCst);
        *services = Some(MockServices(Arc::new(Proxy {
            instances,
            live: self.state.live_connections.clone(),
        })));
        Hresult::S_OK
    }

    fn set_proxy_blanket(&self, _services: &MockServices, blanket: &ProxyBlanket) -> Hresult {
        if let Some(code) = self.fault(MockFault::SetProxyBlanket) {
            return code;
        }
        self.state.blankets.lock().push(*blanket);
        Hresult::S_OK
    }

    fn delete_instance(
        &self,
        services: &MockServices,
        object_path: &ComBstr,
        flags: CallFlags,
        context: Option<&MockContext>,
        call_result: &mut Option<MockCallResult>,
    ) -> Hresult {
        if let Some(code) = self.fault(MockFault::DeleteInstance) {
            return code;
        }
        if flags != CallFlags::RETURN_IMMEDIATELY {
            return Hresult::E_INVALIDARG;
        }
        let Ok(path) = object_path.to_string_lossy().parse::<ObjectPath>() else {
            return Hresult::WBEM_E_INVALID_OBJECT_PATH;
        };
        if context.is_some() {
            self.state.contexts_seen.fetch_add(1, Ordering::SeqCst);
        }

        let completion = Arc::new(Completion::default());
        let instances = services.0.instances.clone();
        let key = instance_key(&path);

        match *self.state.completion_delay.lock() {
            Some(delay) => {
                let completion = completion.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    completion.complete(delete_from(&instances, &key));
                });
            }
            None => completion.complete(delete_from(&instances, &key)),
        }

        *call_result = Some(MockCallResult(completion));
        Hresult::S_OK
    }

    fn get_call_status(
        &self,
        call_result: &MockCallResult,
        timeout: CallTimeout,
        status: &mut Hresult,
    ) -> Hresult {
        if let Some(code) = self.fault(MockFault::GetCallStatus) {
            return code;
        }

        let completion = &call_result.0;
        let mut slot = completion.status.lock();
        match timeout {
            CallTimeout::Infinite => {
                while slot.is_none() {
                    completion.done.wait(&mut slot);
                }
            }
            CallTimeout::Millis(ms) => {
                completion.done.wait_while_for(
                    &mut slot,
                    |s| s.is_none(),
                    Duration::from_millis(ms.into()),
                );
            }
        }

        match *slot {
            Some(_) if self.state.status_unwritten.load(Ordering::SeqCst) => Hresult::S_OK,
            Some(code) => {
                *status = code;
                Hresult::S_OK
            }
            None => Hresult::WBEM_S_TIMEDOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "root\\cimv2";

    fn connect(runtime: &MockRuntime) -> MockServices {
        let locator = runtime.create_locator().unwrap();
        let namespace = ComBstr::from(NS);
        let request = ConnectRequest {
            namespace: &namespace,
            locale: None,
            security_flags: 0,
        };
        let mut services = None;
        assert_eq!(
            runtime.connect_server(&locator, &request, &mut services),
            Hresult::S_OK
        );
        services.unwrap()
    }

    #[test]
    fn test_namespace_lookup_is_case_and_slash_insensitive() {
        let runtime = MockRuntime::new().with_namespace("ROOT/CIMV2");
        runtime.add_instance(NS, "Win32_Service.Name='spooler'");
        assert!(runtime.contains_instance("root\\CIMV2", "win32_service.name='spooler'"));
        assert!(!runtime.contains_instance("root\\other", "Win32_Service.Name='spooler'"));
    }

    #[test]
    fn test_timed_wait_reports_timeout_before_completion() {
        let runtime = MockRuntime::new().with_namespace(NS);
        runtime.add_instance(NS, "C.K='1'");
        runtime.set_completion_delay(Some(Duration::from_millis(200)));
        let services = connect(&runtime);

        let mut call = None;
        let hr = runtime.delete_instance(
            &services,
            &ComBstr::from("C.K='1'"),
            CallFlags::RETURN_IMMEDIATELY,
            None,
            &mut call,
        );
        assert_eq!(hr, Hresult::S_OK);
        let call = call.unwrap();

        let mut status = Hresult::E_FAIL;
        let hr = runtime.get_call_status(&call, CallTimeout::Millis(0), &mut status);
        assert_eq!(hr, Hresult::WBEM_S_TIMEDOUT);
        assert_eq!(status, Hresult::E_FAIL);

        let hr = runtime.get_call_status(&call, CallTimeout::Infinite, &mut status);
        assert_eq!(hr, Hresult::S_OK);
        assert_eq!(status, Hresult::S_OK);
    }

    #[test]
    fn test_invalid_object_path_fails_submission() {
        let runtime = MockRuntime::new().with_namespace(NS);
        let services = connect(&runtime);
        let mut call = None;
        let hr = runtime.delete_instance(
            &services,
            &ComBstr::from("C.K='unterminated"),
            CallFlags::RETURN_IMMEDIATELY,
            None,
            &mut call,
        );
        assert_eq!(hr, Hresult::WBEM_E_INVALID_OBJECT_PATH);
        assert!(call.is_none());
    }

    #[test]
    fn test_live_connections_track_proxy_references() {
        let runtime = MockRuntime::new().with_namespace(NS);
        let services = connect(&runtime);
        let copy = services.clone();
        assert_eq!(runtime.live_connections(), 1);
        drop(services);
        assert_eq!(runtime.live_connections(), 1);
        drop(copy);
        assert_eq!(runtime.live_connections(), 0);
    }
}
