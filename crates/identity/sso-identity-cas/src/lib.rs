//! CAS (Central Authentication Service) provider for the
//! social-authentication framework.
//!
//! Three axum handlers implement the three legs of the CAS handshake:
//! the login route redirects the browser to the CAS server, the callback
//! route validates the returned ticket through the delegated
//! [`cas_client::CasClient`] and hands the normalized identity to login
//! completion, and the logout route redirects to the server's logout
//! page. A [`CasLogoutListener`] hooks the host's logout pipeline to
//! suggest closing the CAS session as well.

mod config;
mod error;
mod handlers;
mod provider;
mod signals;

#[cfg(test)]
mod tests;

pub use config::{AuthAction, CasProviderConfig};
pub use error::{CasError, CasResult};
pub use handlers::{CasState, router};
pub use provider::CasProvider;
pub use signals::CasLogoutListener;

// Re-export what integrators need to configure a provider.
pub use cas_client::CasVersion;

/// Session key holding the id of the CAS provider that authenticated the
/// current session. Set by the callback handler, read back on logout.
pub const CAS_PROVIDER_SESSION_KEY: &str = "sso_cas_provider";
