//! CAS view errors and the single error boundary.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use cas_client::CasClientError;
use sso_identity_core::IdentityError;

pub type CasResult<T> = Result<T, CasError>;

/// Generic failure page shown whenever the handshake did not produce an
/// authenticated user. Deliberately free of any detail about why.
const LOGIN_FAILURE_PAGE: &str = "\
<!DOCTYPE html>
<html>
<head><title>Login Failure</title></head>
<body>
<h1>Social Network Login Failure</h1>
<p>An error occurred while attempting to login via your social network account.</p>
</body>
</html>
";

#[derive(Debug, Error)]
pub enum CasError {
    /// The inbound ticket is missing or the CAS server rejected it. The
    /// only recoverable failure: the user lands on the generic failure
    /// page and may restart the flow.
    #[error("{0}")]
    Authentication(String),

    /// The delegated client failed (network, bad payload, bad server
    /// URL). Surfaces through the host's generic error handling.
    #[error(transparent)]
    Client(#[from] CasClientError),

    /// Framework-level failure (unknown provider, session backend).
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl IntoResponse for CasError {
    fn into_response(self) -> Response {
        match self {
            CasError::Authentication(reason) => {
                warn!(%reason, "CAS authentication failed");
                // Rendered page, not a redirect; same status the host
                // uses for its own login-failure template.
                (StatusCode::OK, Html(LOGIN_FAILURE_PAGE)).into_response()
            }
            CasError::Client(e) => {
                error!(error = %e, "CAS client failure");
                (StatusCode::BAD_GATEWAY, "Authentication service failure").into_response()
            }
            CasError::Identity(IdentityError::ProviderNotFound(id)) => {
                warn!(provider_id = %id, "Unknown CAS provider");
                (StatusCode::NOT_FOUND, "Unknown provider").into_response()
            }
            CasError::Identity(e) => {
                error!(error = %e, "Identity framework failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
