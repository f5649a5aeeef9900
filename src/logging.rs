//! Logging initialization.
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own (typically C callers) can install one here.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable read when no explicit filter is given.
pub const LOG_ENV: &str = "WMI_SERVICE_LOG";

const DEFAULT_FILTER: &str = "wmi_service=info";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

/// Install a compact stderr subscriber.
///
/// `directives` takes precedence over [`LOG_ENV`], which takes precedence
/// over `wmi_service=info`.
pub fn init_logging(directives: Option<&str>) -> Result<(), LoggingError> {
    let env_filter = match directives {
        Some(d) => EnvFilter::try_new(d).map_err(|e| LoggingError::Filter(e.to_string()))?,
        None => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
            .map_err(|e| LoggingError::Filter(e.to_string()))?,
    };

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .compact()
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        // Only this test installs a global subscriber.
        init_logging(Some("wmi_service=debug")).unwrap();
        assert!(matches!(
            init_logging(None),
            Err(LoggingError::AlreadyInitialized)
        ));
    }
}
