//! Identity provider configuration.
//!
//! Everything the mock needs to run: its entity ID, endpoint URLs, PEM
//! key material for signing, the canned user it authenticates, and the
//! protocol lifetimes. Deserializable so test suites can load it from a
//! fixture file.
//!
//! Key material stays PEM strings here and is handed to the signer
//! whole; it is never logged or serialized back out.

use chrono::Duration;
use serde::Deserialize;

use crate::bindings::DEFAULT_MAX_DECODED_LEN;
use crate::types::{Attribute, NameId};

/// Configuration for the mock identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpConfig {
    /// The IdP's entity ID.
    pub entity_id: String,

    /// Base URL of the IdP, used to derive endpoint locations.
    pub base_url: String,

    /// PEM-encoded RSA private key used for signing.
    pub private_key_pem: String,

    /// PEM-encoded X.509 certificate published in metadata and KeyInfo.
    pub certificate_pem: String,

    /// The canned user every login authenticates as.
    #[serde(default)]
    pub user: MockUserProfile,

    /// Assertion validity window in seconds.
    #[serde(default = "default_assertion_lifetime_secs")]
    pub assertion_lifetime_secs: i64,

    /// How long a pending login session lives, in seconds.
    #[serde(default = "default_session_lifetime_secs")]
    pub session_lifetime_secs: i64,

    /// Cap on the decoded size of inbound messages, in bytes.
    #[serde(default = "default_max_decoded_len")]
    pub max_decoded_len: usize,
}

fn default_assertion_lifetime_secs() -> i64 {
    15 * 60
}

fn default_session_lifetime_secs() -> i64 {
    5 * 60
}

fn default_max_decoded_len() -> usize {
    DEFAULT_MAX_DECODED_LEN
}

impl IdpConfig {
    /// Creates a configuration with default lifetimes and user profile.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        base_url: impl Into<String>,
        private_key_pem: impl Into<String>,
        certificate_pem: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            base_url: base_url.into(),
            private_key_pem: private_key_pem.into(),
            certificate_pem: certificate_pem.into(),
            user: MockUserProfile::default(),
            assertion_lifetime_secs: default_assertion_lifetime_secs(),
            session_lifetime_secs: default_session_lifetime_secs(),
            max_decoded_len: default_max_decoded_len(),
        }
    }

    /// Returns the SSO endpoint URL.
    #[must_use]
    pub fn sso_url(&self) -> String {
        format!("{}/sso", self.base_url.trim_end_matches('/'))
    }

    /// Returns the metadata endpoint URL.
    #[must_use]
    pub fn metadata_url(&self) -> String {
        format!("{}/metadata", self.base_url.trim_end_matches('/'))
    }

    /// Returns the assertion validity window.
    #[must_use]
    pub fn assertion_lifetime(&self) -> Duration {
        Duration::seconds(self.assertion_lifetime_secs)
    }

    /// Returns the pending session lifetime.
    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        Duration::seconds(self.session_lifetime_secs)
    }
}

/// The canned user the mock authenticates on every login.
#[derive(Debug, Clone, Deserialize)]
pub struct MockUserProfile {
    /// The subject's name ID value, an email address.
    pub email: String,

    /// Attributes asserted about the subject, in declaration order.
    #[serde(default)]
    pub attributes: Vec<(String, Vec<String>)>,
}

impl Default for MockUserProfile {
    fn default() -> Self {
        Self {
            email: "testuser@example.com".to_string(),
            attributes: vec![
                (
                    "email".to_string(),
                    vec!["testuser@example.com".to_string()],
                ),
                ("displayName".to_string(), vec!["Test User".to_string()]),
            ],
        }
    }
}

impl MockUserProfile {
    /// Returns the subject as a SAML name ID.
    #[must_use]
    pub fn name_id(&self) -> NameId {
        NameId::email(&self.email)
    }

    /// Returns the profile's attributes as SAML attributes.
    #[must_use]
    pub fn saml_attributes(&self) -> Vec<Attribute> {
        self.attributes
            .iter()
            .map(|(name, values)| Attribute::multi(name.clone(), values.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> IdpConfig {
        IdpConfig::new("https://idp.example.com", "https://idp.example.com/", "", "")
    }

    #[test]
    fn endpoint_urls_strip_trailing_slash() {
        let config = minimal_config();
        assert_eq!(config.sso_url(), "https://idp.example.com/sso");
        assert_eq!(config.metadata_url(), "https://idp.example.com/metadata");
    }

    #[test]
    fn default_lifetimes() {
        let config = minimal_config();
        assert_eq!(config.assertion_lifetime(), Duration::minutes(15));
        assert_eq!(config.session_lifetime(), Duration::minutes(5));
    }

    #[test]
    fn profile_attributes_keep_order() {
        let profile = MockUserProfile::default();
        let attrs = profile.saml_attributes();
        assert_eq!(attrs[0].name, "email");
        assert_eq!(attrs[1].name, "displayName");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = serde_json::json!({
            "entity_id": "https://idp.example.com",
            "base_url": "https://idp.example.com",
            "private_key_pem": "key",
            "certificate_pem": "cert",
        });
        let config: IdpConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.session_lifetime_secs, 300);
        assert_eq!(config.user.email, "testuser@example.com");
    }
}
