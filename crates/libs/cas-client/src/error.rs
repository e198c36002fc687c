//! CAS client error types.

use thiserror::Error;

pub type CasClientResult<T> = Result<T, CasClientError>;

#[derive(Debug, Error)]
pub enum CasClientError {
    #[error("Unsupported CAS version: {0}")]
    UnsupportedVersion(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid validation response: {0}")]
    InvalidResponse(String),
}
