//! CAS provider configuration.

use std::collections::HashMap;

use cas_client::CasVersion;
use sso_identity_core::MessageLevel;

/// What the browser is being sent to the CAS server for.
///
/// Carried by the `action` query parameter on the login route; unknown
/// values fall back to a plain authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthAction {
    #[default]
    Authenticate,
    Reauthenticate,
    Deauthenticate,
}

impl AuthAction {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("reauthenticate") => AuthAction::Reauthenticate,
            Some("deauthenticate") => AuthAction::Deauthenticate,
            _ => AuthAction::Authenticate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthAction::Authenticate => "authenticate",
            AuthAction::Reauthenticate => "reauthenticate",
            AuthAction::Deauthenticate => "deauthenticate",
        }
    }
}

/// Static configuration of one CAS identity source.
///
/// Built once at application startup; providers never mutate it
/// afterwards.
#[derive(Debug, Clone)]
pub struct CasProviderConfig {
    /// Unique id of the provider in this deployment; part of its routes.
    pub provider_id: String,
    /// Human-readable name used in user-facing messages.
    pub display_name: String,
    /// Base URL of the CAS server.
    pub server_url: String,
    /// CAS protocol version spoken by the server.
    pub version: CasVersion,
    /// Static extra parameters appended to the CAS login URL.
    pub auth_params: HashMap<String, String>,
    /// Whether to suggest logging out of the CAS server too when the
    /// user logs out of this application.
    pub message_on_logout: bool,
    /// Severity of that suggestion.
    pub message_on_logout_level: MessageLevel,
}

impl CasProviderConfig {
    pub fn new(
        provider_id: impl Into<String>,
        display_name: impl Into<String>,
        server_url: impl Into<String>,
        version: CasVersion,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            display_name: display_name.into(),
            server_url: server_url.into(),
            version,
            auth_params: HashMap::new(),
            message_on_logout: false,
            message_on_logout_level: MessageLevel::Info,
        }
    }

    pub fn with_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_params.insert(key.into(), value.into());
        self
    }

    pub fn with_logout_message(mut self, level: MessageLevel) -> Self {
        self.message_on_logout = true;
        self.message_on_logout_level = level;
        self
    }
}
