//! Login completion and logout pipeline.
//!
//! [`AccountService::complete_login`] is the entry point providers hand a
//! [`VerifiedIdentity`] to once their upstream server vouched for the
//! user; it records the login on the session and resolves where to send
//! the browser next. [`AccountService::logout`] is the counterpart: it
//! notifies registered [`LogoutListener`]s while the session is still
//! populated, then ends the session.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use sso_identity_core::{
    IdentityResult, MessageStore, SessionStore, VerifiedIdentity,
};

/// Session key holding the authenticated user's uid.
pub const SESSION_ACCOUNT_USER_KEY: &str = "account_user";
/// Session key holding the id of the provider that authenticated the user.
pub const SESSION_ACCOUNT_PROVIDER_KEY: &str = "account_auth_provider";
/// Session key holding the provider's extra attributes, JSON-encoded.
pub const SESSION_ACCOUNT_EXTRA_KEY: &str = "account_extra_data";

#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Where to send the browser after a completed login, absent a
    /// usable `next` parameter.
    pub login_redirect_url: String,
    /// Where to send the browser after logout.
    pub logout_redirect_url: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            login_redirect_url: "/accounts/profile/".to_string(),
            logout_redirect_url: "/".to_string(),
        }
    }
}

/// Hook fired when a user logs out, while the session is still readable.
#[async_trait]
pub trait LogoutListener: Send + Sync {
    async fn on_logout(
        &self,
        session: &dyn SessionStore,
        messages: &dyn MessageStore,
        next_page: &str,
    ) -> IdentityResult<()>;
}

/// Only same-origin absolute paths are usable redirect targets.
///
/// Rejects empty values, protocol-relative URLs (`//evil.net`), backslash
/// tricks and anything carrying a scheme.
pub fn sanitize_next_path(next: &str) -> Option<&str> {
    let trimmed = next.trim();
    if trimmed.is_empty() || !trimmed.starts_with('/') {
        return None;
    }
    if trimmed.starts_with("//") || trimmed.starts_with("/\\") || trimmed.contains("://") {
        return None;
    }
    Some(trimmed)
}

pub struct AccountService {
    config: AccountConfig,
    logout_listeners: Vec<Arc<dyn LogoutListener>>,
}

impl AccountService {
    pub fn new(config: AccountConfig) -> Self {
        Self {
            config,
            logout_listeners: Vec::new(),
        }
    }

    pub fn add_logout_listener(&mut self, listener: Arc<dyn LogoutListener>) {
        self.logout_listeners.push(listener);
    }

    pub fn logout_redirect_url(&self) -> &str {
        &self.config.logout_redirect_url
    }

    /// Record a verified identity on the session and resolve the
    /// post-login redirect path.
    ///
    /// User lookup/creation belongs to the host application; the session
    /// record written here is what downstream middleware keys on.
    pub async fn complete_login(
        &self,
        session: &dyn SessionStore,
        identity: &VerifiedIdentity,
        next: Option<&str>,
    ) -> IdentityResult<String> {
        session
            .set(SESSION_ACCOUNT_USER_KEY, identity.uid.clone())
            .await?;
        session
            .set(SESSION_ACCOUNT_PROVIDER_KEY, identity.provider_id.clone())
            .await?;
        session
            .set(
                SESSION_ACCOUNT_EXTRA_KEY,
                serde_json::to_string(&identity.extra)?,
            )
            .await?;

        info!(
            provider_id = %identity.provider_id,
            uid = %identity.uid,
            "Completed social login"
        );

        Ok(next
            .and_then(sanitize_next_path)
            .unwrap_or(&self.config.login_redirect_url)
            .to_string())
    }

    /// Notify logout listeners, end the session, and resolve the
    /// post-logout redirect path.
    ///
    /// Listeners run before the session is cleared so they can still read
    /// login-time bookkeeping.
    pub async fn logout(
        &self,
        session: &dyn SessionStore,
        messages: &dyn MessageStore,
        next: Option<&str>,
    ) -> IdentityResult<String> {
        let next_page = next
            .and_then(sanitize_next_path)
            .unwrap_or(&self.config.logout_redirect_url)
            .to_string();

        for listener in &self.logout_listeners {
            listener.on_logout(session, messages, &next_page).await?;
        }

        session.clear().await?;

        Ok(next_page)
    }
}
