//! SAML Assertion types.
//!
//! The assertion carries the authenticated subject, the validity window,
//! the audience restriction, and the subject's attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{xml_escape, NameId, AC_PASSWORD_PROTECTED_TRANSPORT, CM_BEARER, SAML_NS};

/// SAML Assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// SAML protocol version, always "2.0".
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the issuing identity provider.
    pub issuer: String,

    /// The authenticated subject.
    pub subject: Subject,

    /// Validity window and audience restriction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// How and when the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_statement: Option<AuthnStatement>,

    /// Attributes describing the subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl Assertion {
    /// Creates a new assertion for a subject.
    #[must_use]
    pub fn new(issuer: impl Into<String>, subject: Subject, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: "2.0".to_string(),
            issue_instant,
            issuer: issuer.into(),
            subject,
            conditions: None,
            authn_statement: None,
            attributes: Vec::new(),
        }
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statement = Some(statement);
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Writes the assertion element into an XML document.
    ///
    /// Output is deterministic for a fixed assertion: fixed attribute
    /// order, millisecond UTC timestamps, no insignificant whitespace.
    pub(crate) fn write_xml(&self, out: &mut String) {
        out.push_str(&format!(
            r#"<saml:Assertion xmlns:saml="{}" ID="{}" Version="{}" IssueInstant="{}">"#,
            SAML_NS,
            xml_escape(&self.id),
            xml_escape(&self.version),
            format_instant(self.issue_instant),
        ));
        out.push_str(&format!(
            "<saml:Issuer>{}</saml:Issuer>",
            xml_escape(&self.issuer)
        ));
        self.subject.write_xml(out);
        if let Some(conditions) = &self.conditions {
            conditions.write_xml(out);
        }
        if let Some(statement) = &self.authn_statement {
            statement.write_xml(out);
        }
        if !self.attributes.is_empty() {
            out.push_str("<saml:AttributeStatement>");
            for attribute in &self.attributes {
                attribute.write_xml(out);
            }
            out.push_str("</saml:AttributeStatement>");
        }
        out.push_str("</saml:Assertion>");
    }
}

/// Formats a timestamp the way SAML messages carry them.
pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Subject of an assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier of the subject.
    pub name_id: NameId,

    /// Bearer confirmation data, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<SubjectConfirmation>,
}

impl Subject {
    /// Creates a subject with no confirmation.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id,
            confirmation: None,
        }
    }

    /// Attaches a bearer confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<saml:Subject>");
        match &self.name_id.format {
            Some(format) => out.push_str(&format!(
                r#"<saml:NameID Format="{}">{}</saml:NameID>"#,
                xml_escape(format),
                xml_escape(&self.name_id.value)
            )),
            None => out.push_str(&format!(
                "<saml:NameID>{}</saml:NameID>",
                xml_escape(&self.name_id.value)
            )),
        }
        if let Some(confirmation) = &self.confirmation {
            confirmation.write_xml(out);
        }
        out.push_str("</saml:Subject>");
    }
}

/// Bearer subject confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The request ID this assertion answers.
    pub in_response_to: String,

    /// The ACS URL the assertion may be presented to.
    pub recipient: String,

    /// Time after which the bearer can no longer present the assertion.
    pub not_on_or_after: DateTime<Utc>,
}

impl SubjectConfirmation {
    /// Creates bearer confirmation data for a request.
    #[must_use]
    pub fn bearer(
        in_response_to: impl Into<String>,
        recipient: impl Into<String>,
        not_on_or_after: DateTime<Utc>,
    ) -> Self {
        Self {
            in_response_to: in_response_to.into(),
            recipient: recipient.into(),
            not_on_or_after,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str(&format!(
            concat!(
                r#"<saml:SubjectConfirmation Method="{}">"#,
                r#"<saml:SubjectConfirmationData InResponseTo="{}" Recipient="{}" NotOnOrAfter="{}"/>"#,
                "</saml:SubjectConfirmation>",
            ),
            CM_BEARER,
            xml_escape(&self.in_response_to),
            xml_escape(&self.recipient),
            format_instant(self.not_on_or_after),
        ));
    }
}

/// Validity window and audience restriction for an assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    pub not_before: DateTime<Utc>,

    /// Time at or after which the assertion is not valid.
    pub not_on_or_after: DateTime<Utc>,

    /// Entity IDs the assertion is addressed to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audiences: Vec<String>,
}

impl Conditions {
    /// Creates conditions valid from `not_before` for `lifetime`.
    #[must_use]
    pub fn with_lifetime(not_before: DateTime<Utc>, lifetime: chrono::Duration) -> Self {
        Self {
            not_before,
            not_on_or_after: not_before + lifetime,
            audiences: Vec::new(),
        }
    }

    /// Adds an audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audiences.push(audience.into());
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str(&format!(
            r#"<saml:Conditions NotBefore="{}" NotOnOrAfter="{}">"#,
            format_instant(self.not_before),
            format_instant(self.not_on_or_after),
        ));
        if !self.audiences.is_empty() {
            out.push_str("<saml:AudienceRestriction>");
            for audience in &self.audiences {
                out.push_str(&format!(
                    "<saml:Audience>{}</saml:Audience>",
                    xml_escape(audience)
                ));
            }
            out.push_str("</saml:AudienceRestriction>");
        }
        out.push_str("</saml:Conditions>");
    }
}

/// Authentication statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// The time of authentication.
    pub authn_instant: DateTime<Utc>,

    /// Session index for the IdP session.
    pub session_index: String,

    /// Authentication context class reference URI.
    pub authn_context_class_ref: String,
}

impl AuthnStatement {
    /// Creates an authentication statement for a simulated password login.
    #[must_use]
    pub fn password(authn_instant: DateTime<Utc>) -> Self {
        Self {
            authn_instant,
            session_index: format!("_session{}", mocksaml_crypto::random_alphanumeric(32)),
            authn_context_class_ref: AC_PASSWORD_PROTECTED_TRANSPORT.to_string(),
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str(&format!(
            concat!(
                r#"<saml:AuthnStatement AuthnInstant="{}" SessionIndex="{}">"#,
                "<saml:AuthnContext><saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef></saml:AuthnContext>",
                "</saml:AuthnStatement>",
            ),
            format_instant(self.authn_instant),
            xml_escape(&self.session_index),
            xml_escape(&self.authn_context_class_ref),
        ));
    }
}

/// SAML attribute with one or more values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,

    /// The attribute values, in declaration order.
    pub values: Vec<String>,
}

impl Attribute {
    /// Creates an attribute with a single value.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Creates an attribute with multiple values.
    #[must_use]
    pub fn multi(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str(&format!(
            r#"<saml:Attribute Name="{}">"#,
            xml_escape(&self.name)
        ));
        for value in &self.values {
            out.push_str(&format!(
                "<saml:AttributeValue>{}</saml:AttributeValue>",
                xml_escape(value)
            ));
        }
        out.push_str("</saml:Attribute>");
    }
}
