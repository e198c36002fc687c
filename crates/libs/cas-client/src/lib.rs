//! CAS (Central Authentication Service) protocol client.
//!
//! Covers the three client-side legs of the CAS handshake: building the
//! login redirect URL, building the logout redirect URL, and validating a
//! service ticket against the server. Protocol versions 1.0, 2.0 and 3.0
//! are supported; the version selects the validation endpoint and the
//! response format (plain text for 1.0, XML for 2.0/3.0).

mod client;
mod error;
mod response;


pub use client::{CasClient, CasVersion};
pub use error::{CasClientError, CasClientResult};
pub use response::CasTicketResponse;
