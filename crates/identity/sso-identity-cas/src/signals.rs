//! Logout hook suggesting a CAS logout.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use sso_identity_core::{IdentityResult, MessageStore, ProviderRegistry, SessionStore};
use sso_identity_session::LogoutListener;

use crate::CAS_PROVIDER_SESSION_KEY;
use crate::provider::CasProvider;

/// Fired when a user logs out of the application: if this session was
/// authenticated through a CAS provider whose logout message is enabled,
/// queue a notice suggesting the user also close their CAS session.
pub struct CasLogoutListener {
    registry: Arc<ProviderRegistry<CasProvider>>,
}

impl CasLogoutListener {
    pub fn new(registry: Arc<ProviderRegistry<CasProvider>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl LogoutListener for CasLogoutListener {
    async fn on_logout(
        &self,
        session: &dyn SessionStore,
        messages: &dyn MessageStore,
        next_page: &str,
    ) -> IdentityResult<()> {
        let Some(provider_id) = session.get(CAS_PROVIDER_SESSION_KEY).await? else {
            return Ok(());
        };

        // A marker may outlive the registry entry it names; stale markers
        // are ignored.
        let Some(provider) = self.registry.by_id(&provider_id) else {
            debug!(%provider_id, "Session marker names an unregistered CAS provider");
            return Ok(());
        };

        if !provider.message_on_logout() {
            return Ok(());
        }

        messages
            .add(provider.suggest_logout_message(next_page))
            .await
    }
}
