//! Parsing of CAS ticket-validation responses.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;

use crate::error::{CasClientError, CasClientResult};

/// Outcome of a ticket validation.
///
/// A `user` of `None` means the server rejected the ticket. Rejection is a
/// regular outcome at this layer, not an error; only transport failures and
/// unparseable payloads are errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasTicketResponse {
    /// User identifier on the CAS server, present on success.
    pub user: Option<String>,
    /// Extra user attributes returned by the server (CAS 3.0, or CAS 2.0
    /// servers with the attribute extension). Repeated attribute names
    /// accumulate into an array.
    pub attributes: HashMap<String, Value>,
    /// Proxy-granting ticket IOU, if the server issued one.
    pub pgtiou: Option<String>,
}

impl CasTicketResponse {
    pub fn rejected() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.user.is_some()
    }
}

/// Parse a CAS 1.0 validation body.
///
/// The body is two lines: `yes\n<user>\n` on success, `no\n` on rejection.
/// Anything else is treated as a rejection, matching the permissive
/// behavior of CAS 1.0 clients.
pub(crate) fn parse_v1(body: &str) -> CasTicketResponse {
    let mut lines = body.lines();

    match (lines.next(), lines.next()) {
        (Some("yes"), Some(user)) if !user.is_empty() => CasTicketResponse {
            user: Some(user.to_string()),
            ..CasTicketResponse::default()
        },
        _ => CasTicketResponse::rejected(),
    }
}

/// Parse a CAS 2.0/3.0 `serviceResponse` XML body.
///
/// Success carries `cas:user`, optional `cas:attributes` children and an
/// optional `cas:proxyGrantingTicket`. Failure carries
/// `cas:authenticationFailure`. A body with neither is invalid.
pub(crate) fn parse_xml(body: &str) -> CasClientResult<CasTicketResponse> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut response = CasTicketResponse::default();
    let mut saw_success = false;
    let mut saw_failure = false;
    let mut in_attributes = false;
    // Element whose text content is pending: cas:user, cas:proxyGrantingTicket
    // or an attribute child.
    let mut pending: Option<PendingText> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                let name = std::str::from_utf8(name.as_ref()).unwrap_or("");

                if in_attributes {
                    pending = Some(PendingText::Attribute(name.to_string()));
                    continue;
                }

                match name {
                    "authenticationSuccess" => saw_success = true,
                    "authenticationFailure" => saw_failure = true,
                    "user" if saw_success => pending = Some(PendingText::User),
                    "proxyGrantingTicket" if saw_success => {
                        pending = Some(PendingText::Pgtiou);
                    }
                    "attributes" if saw_success => in_attributes = true,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"attributes" {
                    in_attributes = false;
                }
                pending = None;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| CasClientError::InvalidResponse(e.to_string()))?
                    .to_string();

                match pending.take() {
                    Some(PendingText::User) => response.user = Some(text),
                    Some(PendingText::Pgtiou) => response.pgtiou = Some(text),
                    Some(PendingText::Attribute(name)) => {
                        push_attribute(&mut response.attributes, name, text);
                    }
                    None => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(CasClientError::InvalidResponse(e.to_string())),
        }
    }

    if saw_failure {
        return Ok(CasTicketResponse::rejected());
    }
    if !saw_success {
        return Err(CasClientError::InvalidResponse(
            "response carries no authentication result".to_string(),
        ));
    }
    if response.user.is_none() {
        return Err(CasClientError::InvalidResponse(
            "authentication success without a user".to_string(),
        ));
    }

    Ok(response)
}

enum PendingText {
    User,
    Pgtiou,
    Attribute(String),
}

fn push_attribute(attributes: &mut HashMap<String, Value>, name: String, value: String) {
    match attributes.entry(name) {
        std::collections::hash_map::Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::Array(values) => values.push(Value::String(value)),
            previous => {
                let first = previous.take();
                *previous = Value::Array(vec![first, Value::String(value)]);
            }
        },
        std::collections::hash_map::Entry::Vacant(entry) => {
            entry.insert(Value::String(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn v1_success() {
        let response = parse_v1("yes\nalice\n");
        assert_eq!(response.user.as_deref(), Some("alice"));
        assert!(response.attributes.is_empty());
        assert!(response.pgtiou.is_none());
    }

    #[test]
    fn v1_rejection() {
        assert_eq!(parse_v1("no\n"), CasTicketResponse::rejected());
        assert_eq!(parse_v1(""), CasTicketResponse::rejected());
        assert_eq!(parse_v1("yes\n"), CasTicketResponse::rejected());
    }

    #[test]
    fn xml_success_bare_user() {
        let body = r#"
            <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationSuccess>
                    <cas:user>alice</cas:user>
                </cas:authenticationSuccess>
            </cas:serviceResponse>
        "#;

        let response = parse_xml(body).unwrap();
        assert_eq!(response.user.as_deref(), Some("alice"));
        assert!(response.attributes.is_empty());
    }

    #[test]
    fn xml_success_with_attributes() {
        let body = r#"
            <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationSuccess>
                    <cas:user>alice</cas:user>
                    <cas:attributes>
                        <cas:email>alice@example.net</cas:email>
                        <cas:group>staff</cas:group>
                        <cas:group>admin</cas:group>
                    </cas:attributes>
                    <cas:proxyGrantingTicket>PGTIOU-84678-8a9d</cas:proxyGrantingTicket>
                </cas:authenticationSuccess>
            </cas:serviceResponse>
        "#;

        let response = parse_xml(body).unwrap();
        assert_eq!(response.user.as_deref(), Some("alice"));
        assert_eq!(
            response.attributes.get("email"),
            Some(&json!("alice@example.net"))
        );
        assert_eq!(
            response.attributes.get("group"),
            Some(&json!(["staff", "admin"]))
        );
        assert_eq!(response.pgtiou.as_deref(), Some("PGTIOU-84678-8a9d"));
    }

    #[test]
    fn xml_failure() {
        let body = r#"
            <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationFailure code="INVALID_TICKET">
                    Ticket ST-1856339 not recognized
                </cas:authenticationFailure>
            </cas:serviceResponse>
        "#;

        let response = parse_xml(body).unwrap();
        assert_eq!(response, CasTicketResponse::rejected());
    }

    #[test]
    fn xml_without_result_is_invalid() {
        let body = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas"/>"#;
        assert!(matches!(
            parse_xml(body),
            Err(CasClientError::InvalidResponse(_))
        ));
    }

    #[test]
    fn xml_garbage_is_invalid() {
        assert!(matches!(
            parse_xml("<not-even"),
            Err(CasClientError::InvalidResponse(_))
        ));
    }
}
