//! SAML AuthnRequest parsing.
//!
//! The request message a service provider sends to start a login. The
//! parser is namespace-prefix agnostic (matches on local names), ignores
//! child elements it does not know, and rejects only what a response
//! cannot be built without.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

use super::{NameIdPolicy, SamlBinding};

/// SAML Authentication Request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// SAML protocol version, always "2.0".
    pub version: String,

    /// Timestamp when the request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// Where the response must be delivered.
    pub assertion_consumer_service_url: String,

    /// The IdP endpoint the request was addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Binding URI requested for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Whether the IdP must re-authenticate the user.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,
}

impl AuthnRequest {
    /// Parses an AuthnRequest from its XML form.
    ///
    /// Fails with [`SamlError::MalformedRequest`] when the document is not
    /// well-formed XML, when the root element is not an AuthnRequest, or
    /// when ID, Issuer, or AssertionConsumerServiceURL is absent.
    pub fn from_xml(xml: &str) -> SamlResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut root_seen = false;
        let mut id = None;
        let mut version = None;
        let mut issue_instant = None;
        let mut issuer: Option<String> = None;
        let mut acs_url = None;
        let mut destination = None;
        let mut protocol_binding = None;
        let mut name_id_policy = None;
        let mut force_authn = false;
        let mut is_passive = false;

        // Local name of the element whose text content we are inside of.
        let mut capturing: Option<&'static str> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => {
                    let name = e.local_name();
                    match name.as_ref() {
                        b"AuthnRequest" if !root_seen => {
                            root_seen = true;
                            for attr in e.attributes() {
                                let attr = attr.map_err(|err| {
                                    SamlError::MalformedRequest(format!(
                                        "invalid attribute: {err}"
                                    ))
                                })?;
                                let value = attr
                                    .unescape_value()
                                    .map_err(|err| {
                                        SamlError::MalformedRequest(format!(
                                            "invalid attribute value: {err}"
                                        ))
                                    })?
                                    .into_owned();
                                match attr.key.local_name().as_ref() {
                                    b"ID" => id = Some(value),
                                    b"Version" => version = Some(value),
                                    b"IssueInstant" => issue_instant = Some(value),
                                    b"AssertionConsumerServiceURL" => acs_url = Some(value),
                                    b"Destination" => destination = Some(value),
                                    b"ProtocolBinding" => protocol_binding = Some(value),
                                    b"ForceAuthn" => force_authn = value == "true" || value == "1",
                                    b"IsPassive" => is_passive = value == "true" || value == "1",
                                    _ => {}
                                }
                            }
                        }
                        _ if !root_seen => {
                            return Err(SamlError::MalformedRequest(
                                "root element is not an AuthnRequest".to_string(),
                            ));
                        }
                        b"Issuer" => capturing = Some("Issuer"),
                        b"NameIDPolicy" => {
                            name_id_policy = Some(parse_name_id_policy(&e)?);
                        }
                        _ => {}
                    }
                }
                Event::Text(text) => {
                    if capturing == Some("Issuer") {
                        let value = text.unescape().map_err(|err| {
                            SamlError::MalformedRequest(format!("invalid text content: {err}"))
                        })?;
                        issuer = Some(value.trim().to_string());
                    }
                }
                Event::End(e) => {
                    if capturing == Some("Issuer") && e.local_name().as_ref() == b"Issuer" {
                        capturing = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !root_seen {
            return Err(SamlError::MalformedRequest(
                "document contains no AuthnRequest element".to_string(),
            ));
        }

        let id = id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SamlError::MalformedRequest("missing ID attribute".to_string()))?;
        let issuer = issuer
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SamlError::MalformedRequest("missing Issuer element".to_string()))?;
        let assertion_consumer_service_url = acs_url.filter(|v| !v.is_empty()).ok_or_else(|| {
            SamlError::MalformedRequest("missing AssertionConsumerServiceURL attribute".to_string())
        })?;

        let version = version.unwrap_or_else(|| "2.0".to_string());
        if version != "2.0" {
            return Err(SamlError::MalformedRequest(format!(
                "unsupported SAML version: {version}"
            )));
        }

        let issue_instant = match issue_instant {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|err| {
                    SamlError::MalformedRequest(format!("invalid IssueInstant: {err}"))
                })?
                .with_timezone(&Utc),
            None => {
                return Err(SamlError::MalformedRequest(
                    "missing IssueInstant attribute".to_string(),
                ));
            }
        };

        Ok(Self {
            id,
            version,
            issue_instant,
            issuer,
            assertion_consumer_service_url,
            destination,
            protocol_binding,
            name_id_policy,
            force_authn,
            is_passive,
        })
    }

    /// Returns the parsed response binding, if the request declared one.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding
            .as_deref()
            .and_then(SamlBinding::from_uri)
    }

    /// Leniently pulls the ACS URL out of a request that failed to
    /// parse, so an error response still has somewhere to go.
    #[must_use]
    pub fn extract_acs_url(xml: &str) -> Option<String> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e) | Event::Empty(e)) => {
                    if e.local_name().as_ref() != b"AuthnRequest" {
                        return None;
                    }
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"AssertionConsumerServiceURL" {
                            return attr
                                .unescape_value()
                                .ok()
                                .map(|v| v.into_owned())
                                .filter(|v| !v.is_empty());
                        }
                    }
                    return None;
                }
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }
}

fn parse_name_id_policy(e: &BytesStart<'_>) -> SamlResult<NameIdPolicy> {
    let mut policy = NameIdPolicy::default();
    for attr in e.attributes() {
        let attr = attr
            .map_err(|err| SamlError::MalformedRequest(format!("invalid attribute: {err}")))?;
        let value = attr
            .unescape_value()
            .map_err(|err| {
                SamlError::MalformedRequest(format!("invalid attribute value: {err}"))
            })?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"Format" => policy.format = Some(value),
            b"AllowCreate" => policy.allow_create = value == "true" || value == "1",
            _ => {}
        }
    }
    Ok(policy)
}
