//! The three legs of the CAS handshake as axum handlers.
//!
//! Each handler resolves the provider from the path, builds the delegated
//! CAS client from its configuration and issues a redirect. Errors bubble
//! to [`CasError`]'s `IntoResponse`, the sole error boundary: a failed
//! authentication renders the generic failure page, everything else maps
//! to the host's generic error statuses.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::get;
use serde::Deserialize;
use tracing::debug;

use sso_identity_core::{IdentityError, ProviderRegistry, SessionStore};
use sso_identity_session::{AccountService, sanitize_next_path};

use crate::CAS_PROVIDER_SESSION_KEY;
use crate::config::AuthAction;
use crate::error::{CasError, CasResult};
use crate::provider::CasProvider;

/// Everything the handlers need, assembled once at startup.
#[derive(Clone)]
pub struct CasState {
    /// Absolute base URL of this application, used to build the service
    /// URL and logout redirect targets.
    pub base_url: String,
    pub registry: Arc<ProviderRegistry<CasProvider>>,
    pub session: Arc<dyn SessionStore>,
    pub accounts: Arc<AccountService>,
}

/// Mount the CAS routes: `/accounts/{provider}/login/`,
/// `/accounts/{provider}/login/callback/` and
/// `/accounts/{provider}/logout/`.
pub fn router(state: CasState) -> Router {
    Router::new()
        .route("/accounts/{provider}/login/", get(login))
        .route("/accounts/{provider}/login/callback/", get(callback))
        .route("/accounts/{provider}/logout/", get(logout))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    action: Option<String>,
    auth_params: Option<String>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    ticket: Option<String>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    next: Option<String>,
}

fn provider_by_id(state: &CasState, id: &str) -> CasResult<Arc<CasProvider>> {
    state
        .registry
        .by_id(id)
        .ok_or_else(|| IdentityError::ProviderNotFound(id.to_string()).into())
}

/// Whether to ask the CAS server to re-prompt for credentials.
///
/// Once this session authenticated through any CAS provider, a further
/// login opts out of single sign-on so the user can pick other
/// credentials.
async fn renew(state: &CasState) -> CasResult<bool> {
    Ok(state.session.get(CAS_PROVIDER_SESSION_KEY).await?.is_some())
}

/// First leg: redirect the browser to the CAS server's login page.
///
/// No local validation happens here; a misconfigured server URL or
/// rejected login only surfaces when the user comes back.
async fn login(
    State(state): State<CasState>,
    Path(provider_id): Path<String>,
    Query(query): Query<LoginQuery>,
) -> CasResult<Redirect> {
    let provider = provider_by_id(&state, &provider_id)?;
    let action = AuthAction::from_param(query.action.as_deref());

    let client = provider.cas_client(
        &state.base_url,
        renew(&state).await?,
        action,
        query.auth_params.as_deref(),
        query.next.as_deref(),
    );

    let login_url = client.login_url()?;
    debug!(provider_id = %provider.config().provider_id, "Redirecting to CAS login");
    Ok(Redirect::to(&login_url))
}

/// Second leg: the CAS server sent the browser back with a ticket.
///
/// The client is rebuilt exactly as at login so the service URL matches
/// what the server saw. A missing or rejected ticket is the one
/// recoverable failure; on success the session is marked and the
/// normalized identity handed to login completion.
async fn callback(
    State(state): State<CasState>,
    Path(provider_id): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> CasResult<Redirect> {
    let provider = provider_by_id(&state, &provider_id)?;

    let client = provider.cas_client(
        &state.base_url,
        renew(&state).await?,
        AuthAction::Authenticate,
        None,
        query.next.as_deref(),
    );

    let ticket = query.ticket.ok_or_else(|| {
        CasError::Authentication("CAS server didn't respond with a ticket".to_string())
    })?;

    let response = client.verify_ticket(&ticket).await?;
    let Some(uid) = response.user else {
        return Err(CasError::Authentication(
            "CAS server doesn't validate the ticket".to_string(),
        ));
    };

    // Keep track of the last used CAS provider.
    state
        .session
        .set(
            CAS_PROVIDER_SESSION_KEY,
            provider.config().provider_id.clone(),
        )
        .await?;

    let identity = provider.identity_from_response(&uid, &response.attributes);
    let redirect_to = state
        .accounts
        .complete_login(state.session.as_ref(), &identity, query.next.as_deref())
        .await?;

    Ok(Redirect::to(&redirect_to))
}

/// Third leg: redirect the browser to the CAS server's logout page,
/// telling it where to send the user afterwards.
async fn logout(
    State(state): State<CasState>,
    Path(provider_id): Path<String>,
    Query(query): Query<LogoutQuery>,
) -> CasResult<Redirect> {
    let provider = provider_by_id(&state, &provider_id)?;

    let redirect_path = query
        .next
        .as_deref()
        .and_then(sanitize_next_path)
        .unwrap_or_else(|| state.accounts.logout_redirect_url());
    let redirect_to = format!("{}{}", state.base_url.trim_end_matches('/'), redirect_path);

    let client = provider.cas_client(
        &state.base_url,
        renew(&state).await?,
        AuthAction::Deauthenticate,
        None,
        None,
    );

    let logout_url = client.logout_url(Some(&redirect_to))?;
    debug!(provider_id = %provider.config().provider_id, "Redirecting to CAS logout");
    Ok(Redirect::to(&logout_url))
}
