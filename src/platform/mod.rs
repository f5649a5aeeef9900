//! The runtime used when no backend is named.
//!
//! On Windows this is the COM backend. Elsewhere there is no management
//! service to talk to, so every connection attempt fails cleanly.

#[cfg(windows)]
mod com;
#[cfg(not(windows))]
mod unsupported;

#[cfg(windows)]
pub use com::{ApartmentGuard, ComRuntime as PlatformRuntime};
#[cfg(not(windows))]
pub use unsupported::{Unavailable, UnsupportedRuntime as PlatformRuntime};
