//! Core traits and types for the social-authentication framework.
//!
//! Identity providers plug into the framework by producing a
//! [`VerifiedIdentity`] from whatever their upstream server returned; the
//! rest of the framework (session bookkeeping, user messaging, login
//! completion) only ever sees this normalized record.

mod messages;
mod registry;
mod session;

pub use messages::{MemoryMessageStore, Message, MessageLevel, MessageStore};
pub use registry::{Provider, ProviderRegistry};
pub use session::{MemorySessionStore, SessionStore};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Profile fields handed to user provisioning.
///
/// Providers fill what their server exposes; everything beyond `username`
/// is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonFields {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
}

/// An email address reported by a provider, with its verification status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
    pub verified: bool,
    pub primary: bool,
}

/// The normalized identity record produced by a provider.
///
/// Each `(provider_id, uid)` pair is unique and maps to a single user.
/// `extra` carries whatever provider-specific attributes came back with
/// the authentication, untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub provider_id: String,
    pub uid: String,
    pub common: CommonFields,
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub email_addresses: Vec<EmailAddress>,
}
