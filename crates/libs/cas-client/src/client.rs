//! CAS client implementation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CasClientError, CasClientResult};
use crate::response::{self, CasTicketResponse};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// CAS protocol version spoken by the server.
///
/// The version selects the validation endpoint and the response format.
/// Configuration values are parsed with [`FromStr`]; anything other than
/// `"1"`, `"2"` or `"3"` is rejected so that a misconfigured provider
/// fails before any redirect is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasVersion {
    V1,
    V2,
    V3,
}

impl CasVersion {
    /// Path of the ticket-validation endpoint, relative to the server URL.
    fn validate_path(self) -> &'static str {
        match self {
            CasVersion::V1 => "validate",
            CasVersion::V2 => "serviceValidate",
            CasVersion::V3 => "p3/serviceValidate",
        }
    }
}

impl FromStr for CasVersion {
    type Err = CasClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(CasVersion::V1),
            "2" => Ok(CasVersion::V2),
            "3" => Ok(CasVersion::V3),
            other => Err(CasClientError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl fmt::Display for CasVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasVersion::V1 => write!(f, "1"),
            CasVersion::V2 => write!(f, "2"),
            CasVersion::V3 => write!(f, "3"),
        }
    }
}

/// Client for one login attempt against one CAS server.
///
/// The service URL passed here is echoed on every exchange with the
/// server; per the CAS spec it must be byte-identical between the login
/// redirect and the ticket validation, so callers construct the client the
/// same way on both legs.
#[derive(Clone)]
pub struct CasClient {
    service_url: String,
    server_url: String,
    version: CasVersion,
    renew: bool,
    extra_login_params: HashMap<String, String>,
    http: reqwest::Client,
}

impl CasClient {
    pub fn new(
        service_url: impl Into<String>,
        server_url: impl Into<String>,
        version: CasVersion,
        renew: bool,
        extra_login_params: HashMap<String, String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            service_url: service_url.into(),
            server_url: server_url.into(),
            version,
            renew,
            extra_login_params,
            http,
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn renew(&self) -> bool {
        self.renew
    }

    /// URL of the server's login page for this service.
    ///
    /// `renew=true` is appended when single sign-on is opted out; extra
    /// login parameters go last.
    pub fn login_url(&self) -> CasClientResult<String> {
        let mut url = self.server_endpoint("login")?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("service", &self.service_url);
            if self.renew {
                params.append_pair("renew", "true");
            }
            for (key, value) in &self.extra_login_params {
                params.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }

    /// URL of the server's logout page, optionally carrying the URL the
    /// server should send the browser back to.
    pub fn logout_url(&self, redirect_to: Option<&str>) -> CasClientResult<String> {
        let mut url = self.server_endpoint("logout")?;

        if let Some(target) = redirect_to {
            url.query_pairs_mut().append_pair("url", target);
        }

        Ok(url.to_string())
    }

    /// Validate a service ticket against the server.
    ///
    /// Rejection by the server yields a response whose `user` is `None`;
    /// only transport failures and unparseable bodies are errors.
    pub async fn verify_ticket(&self, ticket: &str) -> CasClientResult<CasTicketResponse> {
        let mut url = self.server_endpoint(self.version.validate_path())?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("ticket", ticket);
            params.append_pair("service", &self.service_url);
            if self.renew {
                params.append_pair("renew", "true");
            }
        }

        debug!(version = %self.version, "Validating CAS ticket");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "CAS validation endpoint returned an error status");
            return Err(CasClientError::InvalidResponse(format!(
                "validation endpoint returned status {status}"
            )));
        }

        let body = response.text().await?;
        let parsed = match self.version {
            CasVersion::V1 => response::parse_v1(&body),
            CasVersion::V2 | CasVersion::V3 => response::parse_xml(&body)?,
        };

        match &parsed.user {
            Some(user) => info!(%user, "CAS server validated the ticket"),
            None => info!("CAS server rejected the ticket"),
        }

        Ok(parsed)
    }

    fn server_endpoint(&self, segment: &str) -> CasClientResult<Url> {
        let mut base = self.server_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?.join(segment)?)
    }
}
