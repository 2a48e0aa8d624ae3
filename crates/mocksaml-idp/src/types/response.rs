//! SAML Response types and serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assertion::format_instant;
use super::{xml_escape, Assertion, Status, SAMLP_NS, SAML_NS};

/// SAML Response.
///
/// The message an identity provider returns to a service provider's
/// assertion consumer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// SAML protocol version, always "2.0".
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the issuing identity provider.
    pub issuer: String,

    /// The ID of the request this response answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The ACS URL this response is addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The status of the response.
    pub status: Status,

    /// The assertion, absent on error responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Assertion>,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    pub fn success(issuer: impl Into<String>, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: "2.0".to_string(),
            issue_instant,
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            status: Status::success(),
            assertion: None,
        }
    }

    /// Creates an error response with the given status.
    #[must_use]
    pub fn error(issuer: impl Into<String>, issue_instant: DateTime<Utc>, status: Status) -> Self {
        Self {
            status,
            ..Self::success(issuer, issue_instant)
        }
    }

    /// Sets the request ID this response answers.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination ACS URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Attaches the assertion.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Serializes the response to XML.
    ///
    /// Serialization is deterministic for a fixed response: attributes in
    /// a fixed order, millisecond UTC timestamps, no insignificant
    /// whitespace. The signer inserts the Signature element into this
    /// output; after signing the octets are frozen.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(2048);
        out.push_str(&format!(
            r#"<samlp:Response xmlns:samlp="{}" xmlns:saml="{}" ID="{}" Version="{}" IssueInstant="{}""#,
            SAMLP_NS,
            SAML_NS,
            xml_escape(&self.id),
            xml_escape(&self.version),
            format_instant(self.issue_instant),
        ));
        if let Some(destination) = &self.destination {
            out.push_str(&format!(r#" Destination="{}""#, xml_escape(destination)));
        }
        if let Some(in_response_to) = &self.in_response_to {
            out.push_str(&format!(r#" InResponseTo="{}""#, xml_escape(in_response_to)));
        }
        out.push('>');
        out.push_str(&format!(
            "<saml:Issuer>{}</saml:Issuer>",
            xml_escape(&self.issuer)
        ));
        self.write_status(&mut out);
        if let Some(assertion) = &self.assertion {
            assertion.write_xml(&mut out);
        }
        out.push_str("</samlp:Response>");
        out
    }

    fn write_status(&self, out: &mut String) {
        out.push_str("<samlp:Status>");
        out.push_str(&format!(
            r#"<samlp:StatusCode Value="{}"/>"#,
            xml_escape(&self.status.status_code)
        ));
        if let Some(message) = &self.status.status_message {
            out.push_str(&format!(
                "<samlp:StatusMessage>{}</samlp:StatusMessage>",
                xml_escape(message)
            ));
        }
        out.push_str("</samlp:Status>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{status_codes, NameId, Subject};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn success_response_xml() {
        let now = fixed_now();
        let assertion = Assertion::new(
            "https://idp.example.com",
            Subject::new(NameId::email("jane@example.com")),
            now,
        );
        let response = Response::success("https://idp.example.com", now)
            .in_response_to("req-1")
            .with_destination("https://sp.example.com/acs")
            .with_assertion(assertion);

        let xml = response.to_xml();
        assert!(xml.starts_with("<samlp:Response"));
        assert!(xml.contains(r#"InResponseTo="req-1""#));
        assert!(xml.contains(r#"Destination="https://sp.example.com/acs""#));
        assert!(xml.contains(&format!(r#"<samlp:StatusCode Value="{}"/>"#, status_codes::SUCCESS)));
        assert!(xml.contains("<saml:Assertion"));
        assert!(xml.ends_with("</samlp:Response>"));
    }

    #[test]
    fn error_response_has_no_assertion() {
        let response = Response::error(
            "https://idp.example.com",
            fixed_now(),
            Status::requester_error("missing Issuer"),
        );
        let xml = response.to_xml();
        assert!(xml.contains(&format!(
            r#"<samlp:StatusCode Value="{}"/>"#,
            status_codes::REQUESTER
        )));
        assert!(xml.contains("<samlp:StatusMessage>missing Issuer</samlp:StatusMessage>"));
        assert!(!xml.contains("<saml:Assertion"));
    }

    #[test]
    fn issuer_is_escaped() {
        let mut response = Response::success("https://idp.example.com/?a=1&b=2", fixed_now());
        response.id = "_fixed".to_string();
        assert!(response.to_xml().contains("a=1&amp;b=2"));
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut response = Response::success("https://idp.example.com", fixed_now());
        response.id = "_fixed".to_string();
        assert_eq!(response.to_xml(), response.to_xml());
    }
}
