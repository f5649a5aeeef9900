//! Connection options and the proxy security blanket.

use serde::Deserialize;

/// Authentication service used on the service proxy (`RPC_C_AUTHN_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthnService {
    /// NTLM.
    #[default]
    WinNt,
    Negotiate,
    Kerberos,
    /// Let COM pick.
    Default,
}

impl AuthnService {
    pub fn as_raw(self) -> u32 {
        match self {
            AuthnService::WinNt => 10,
            AuthnService::Negotiate => 9,
            AuthnService::Kerberos => 16,
            AuthnService::Default => 0xFFFF_FFFF,
        }
    }
}

/// Authentication level (`RPC_C_AUTHN_LEVEL_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthnLevel {
    Default,
    None,
    Connect,
    /// Authenticate every call.
    #[default]
    Call,
    Packet,
    PacketIntegrity,
    PacketPrivacy,
}

impl AuthnLevel {
    pub fn as_raw(self) -> u32 {
        match self {
            AuthnLevel::Default => 0,
            AuthnLevel::None => 1,
            AuthnLevel::Connect => 2,
            AuthnLevel::Call => 3,
            AuthnLevel::Packet => 4,
            AuthnLevel::PacketIntegrity => 5,
            AuthnLevel::PacketPrivacy => 6,
        }
    }
}

/// Impersonation level (`RPC_C_IMP_LEVEL_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpersonationLevel {
    Default,
    Anonymous,
    Identify,
    #[default]
    Impersonate,
    Delegate,
}

impl ImpersonationLevel {
    pub fn as_raw(self) -> u32 {
        match self {
            ImpersonationLevel::Default => 0,
            ImpersonationLevel::Anonymous => 1,
            ImpersonationLevel::Identify => 2,
            ImpersonationLevel::Impersonate => 3,
            ImpersonationLevel::Delegate => 4,
        }
    }
}

/// Security attributes applied to calls made through the service proxy.
///
/// Authorization service, server principal, client identity and
/// capabilities are always none/null: the handle only ever runs as the
/// calling identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyBlanket {
    pub authn_service: AuthnService,
    pub authn_level: AuthnLevel,
    pub impersonation: ImpersonationLevel,
}

impl ProxyBlanket {
    /// `RPC_C_AUTHZ_NONE`
    pub const AUTHZ_NONE: u32 = 0;
}

/// Options for [`WmiService::connect_with_options`](crate::WmiService::connect_with_options).
///
/// Deserializable from JSON so the C ABI can take options as a string:
///
/// ```json
/// {
///   "locale": "MS_409",
///   "blanket": { "authn_level": "packet_privacy", "impersonation": "identify" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOptions {
    /// Locale passed to ConnectServer; `None` uses the current locale.
    pub locale: Option<String>,
    pub blanket: ProxyBlanket,
}

impl ConnectOptions {
    /// Security flags passed to ConnectServer.
    pub const SECURITY_FLAGS: i32 = 0;

    /// Parse options from JSON; unknown keys at any level are rejected.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blanket_is_ntlm_call_impersonate() {
        let blanket = ProxyBlanket::default();
        assert_eq!(blanket.authn_service.as_raw(), 10);
        assert_eq!(blanket.authn_level.as_raw(), 3);
        assert_eq!(blanket.impersonation.as_raw(), 3);
    }

    #[test]
    fn test_empty_json_is_default() {
        let opts = ConnectOptions::from_json("{}").unwrap();
        assert_eq!(opts, ConnectOptions::default());
        assert!(opts.locale.is_none());
    }

    #[test]
    fn test_partial_override() {
        let opts = ConnectOptions::from_json(
            r#"{"locale": "MS_409", "blanket": {"authn_level": "packet_privacy"}}"#,
        )
        .unwrap();
        assert_eq!(opts.locale.as_deref(), Some("MS_409"));
        assert_eq!(opts.blanket.authn_level, AuthnLevel::PacketPrivacy);
        assert_eq!(opts.blanket.impersonation, ImpersonationLevel::Impersonate);
        assert_eq!(opts.blanket.authn_service, AuthnService::WinNt);
    }

    #[test]
    fn test_rejects_unknown_fields_and_values() {
        assert!(ConnectOptions::from_json(r#"{"user": "admin"}"#).is_err());
        assert!(ConnectOptions::from_json(r#"{"blanket": {"authn_level": "loud"}}"#).is_err());
        let err = ConnectOptions::from_json(r#"{"blanket": {"authn_levl": "packet_privacy"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("authn_levl"));
    }
}
