//! CAS provider: URL building, auth-parameter assembly and extraction of
//! the normalized identity from a validated CAS response.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;
use url::form_urlencoded;

use cas_client::CasClient;
use sso_identity_core::{
    CommonFields, EmailAddress, Message, MessageLevel, Provider, VerifiedIdentity,
};

use crate::config::{AuthAction, CasProviderConfig};

/// Query keys the CAS client itself owns on the login redirect.
/// Client-supplied dynamic parameters must not shadow them.
const RESERVED_LOGIN_PARAMS: &[&str] = &["service", "ticket", "renew"];

pub struct CasProvider {
    config: CasProviderConfig,
}

impl Provider for CasProvider {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn name(&self) -> &str {
        &self.config.display_name
    }
}

impl CasProvider {
    pub fn new(config: CasProviderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CasProviderConfig {
        &self.config
    }

    // URL builders for the provider's own routes.

    pub fn login_path(&self, params: &[(&str, &str)]) -> String {
        self.route_path("login/", params)
    }

    pub fn callback_path(&self, params: &[(&str, &str)]) -> String {
        self.route_path("login/callback/", params)
    }

    pub fn logout_path(&self, params: &[(&str, &str)]) -> String {
        self.route_path("logout/", params)
    }

    fn route_path(&self, suffix: &str, params: &[(&str, &str)]) -> String {
        let mut path = format!("/accounts/{}/{}", self.config.provider_id, suffix);
        if !params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            path.push('?');
            path.push_str(&query);
        }
        path
    }

    /// The service URL passed to the CAS server: the absolute callback
    /// URL, with `next` appended when present.
    ///
    /// Per the CAS spec the server echoes it back and the validation leg
    /// must present the identical value, so both handlers derive it
    /// through here.
    pub fn service_url(&self, base_url: &str, next: Option<&str>) -> String {
        let callback = match next {
            Some(next) => self.callback_path(&[("next", next)]),
            None => self.callback_path(&[]),
        };
        format!("{}{}", base_url.trim_end_matches('/'), callback)
    }

    /// Parameters for the CAS login URL: static configuration merged with
    /// the URL-encoded `auth_params` blob from the request, dynamic
    /// entries winning.
    ///
    /// Dynamic keys that would shadow protocol parameters are dropped;
    /// the blob is attacker-controlled and must stay confined to benign
    /// extras.
    pub fn auth_params(
        &self,
        _action: AuthAction,
        dynamic: Option<&str>,
    ) -> HashMap<String, String> {
        let mut params = self.config.auth_params.clone();

        if let Some(blob) = dynamic {
            for (key, value) in form_urlencoded::parse(blob.as_bytes()) {
                if RESERVED_LOGIN_PARAMS.contains(&key.as_ref()) {
                    warn!(
                        provider_id = %self.config.provider_id,
                        param = %key,
                        "Dropping reserved CAS parameter from dynamic auth_params"
                    );
                    continue;
                }
                params.insert(key.into_owned(), value.into_owned());
            }
        }

        params
    }

    /// Build the delegated CAS client for one leg of the handshake.
    pub fn cas_client(
        &self,
        base_url: &str,
        renew: bool,
        action: AuthAction,
        dynamic_params: Option<&str>,
        next: Option<&str>,
    ) -> CasClient {
        CasClient::new(
            self.service_url(base_url, next),
            &self.config.server_url,
            self.config.version,
            renew,
            self.auth_params(action, dynamic_params),
        )
    }

    // Extraction from a validated CAS response.

    pub fn extract_common_fields(
        &self,
        uid: &str,
        attributes: &HashMap<String, Value>,
    ) -> CommonFields {
        let text = |key: &str| {
            attributes
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        CommonFields {
            username: text("username").unwrap_or_else(|| uid.to_string()),
            email: text("email"),
            first_name: text("first_name"),
            last_name: text("last_name"),
            name: text("name"),
        }
    }

    /// Attributes to keep on the identity record: everything the server
    /// returned, plus the uid itself.
    pub fn extract_extra_data(
        &self,
        uid: &str,
        attributes: &HashMap<String, Value>,
    ) -> serde_json::Map<String, Value> {
        let mut extra: serde_json::Map<String, Value> = attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        extra.insert("uid".to_string(), Value::String(uid.to_string()));
        extra
    }

    /// CAS servers do not report email verification, so no address is
    /// ever marked verified by default.
    pub fn extract_email_addresses(
        &self,
        _uid: &str,
        _attributes: &HashMap<String, Value>,
    ) -> Vec<EmailAddress> {
        Vec::new()
    }

    pub fn identity_from_response(
        &self,
        uid: &str,
        attributes: &HashMap<String, Value>,
    ) -> VerifiedIdentity {
        VerifiedIdentity {
            provider_id: self.config.provider_id.clone(),
            uid: uid.to_string(),
            common: self.extract_common_fields(uid, attributes),
            extra: self.extract_extra_data(uid, attributes),
            email_addresses: self.extract_email_addresses(uid, attributes),
        }
    }

    // Post-logout message suggesting a CAS logout as well.

    pub fn message_on_logout(&self) -> bool {
        self.config.message_on_logout
    }

    pub fn message_on_logout_level(&self) -> MessageLevel {
        self.config.message_on_logout_level
    }

    /// Notice asking the user to also close their CAS session, with a
    /// link to this provider's logout route carrying `next_page`.
    pub fn suggest_logout_message(&self, next_page: &str) -> Message {
        let logout_url = self.logout_path(&[("next", next_page)]);

        let body = format!(
            "To logout of {}, please close your browser, or visit this \
             <a href=\"{}\">link</a>.",
            html_escape(self.name()),
            html_escape(&logout_url),
        );

        Message {
            level: self.config.message_on_logout_level,
            body,
        }
    }
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
