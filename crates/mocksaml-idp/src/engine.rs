//! SP-initiated login flow engine.
//!
//! Drives one AuthnRequest from transport decoding through session
//! tracking, response construction, signing, and response encoding.
//!
//! Failure handling follows the SAML split: transport failures (bad
//! base64, bad deflate, oversized payloads) are hard errors because no
//! well-formed request exists to answer; protocol failures (malformed
//! request, replay, duplicate) produce a signed SAML error response
//! delivered to the SP's ACS URL like any success would be. Signing
//! failures are always hard, a response is never sent unsigned.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::bindings::{HttpPostBinding, HttpRedirectBinding};
use crate::config::{IdpConfig, MockUserProfile};
use crate::error::{SamlError, SamlResult};
use crate::session::{SessionState, SessionTracker};
use crate::signature::XmlSigner;
use crate::types::{
    Assertion, AuthnRequest, AuthnStatement, Conditions, Response, SamlBinding, Status, Subject,
    SubjectConfirmation,
};

/// The outcome of handling an AuthnRequest: a signed response encoded
/// for delivery to the SP's assertion consumer service.
#[derive(Debug, Clone)]
pub struct SsoResponse {
    /// The ACS URL the response goes to.
    pub destination: String,

    /// RelayState echoed back untouched, if the SP sent one.
    pub relay_state: Option<String>,

    /// The signed response XML. These octets are frozen; reserializing
    /// would break the signature.
    pub response_xml: String,

    /// Auto-submitting HTML form carrying the response (HTTP-POST).
    pub html: String,

    /// The stable error code when this is a SAML error response.
    pub error_code: Option<&'static str>,
}

impl SsoResponse {
    /// Returns true if this carries a Success response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_code.is_none()
    }
}

/// Orchestrates the SP-initiated SSO flow.
pub struct FlowEngine {
    config: IdpConfig,
    signer: XmlSigner,
    tracker: SessionTracker,
}

impl FlowEngine {
    /// Creates an engine from configuration.
    ///
    /// Fails if the configured key material is unusable.
    pub fn new(config: IdpConfig) -> SamlResult<Self> {
        let signer = XmlSigner::from_pem(
            &config.private_key_pem,
            Some(config.certificate_pem.as_str()),
        )?;
        let tracker = SessionTracker::new(config.session_lifetime());
        Ok(Self {
            config,
            signer,
            tracker,
        })
    }

    /// Returns the session tracker.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &IdpConfig {
        &self.config
    }

    /// Handles an encoded AuthnRequest arriving over `binding`,
    /// authenticating the configured default user.
    ///
    /// `now` is the engine's only notion of time; callers pass
    /// `Utc::now()` in production and fixed instants in tests.
    pub fn handle_authn_request(
        &self,
        encoded_request: &str,
        relay_state: Option<&str>,
        binding: SamlBinding,
        now: DateTime<Utc>,
    ) -> SamlResult<SsoResponse> {
        self.handle_authn_request_as(encoded_request, relay_state, binding, None, now)
    }

    /// Handles an encoded AuthnRequest, authenticating `profile` when
    /// given, otherwise the configured default user.
    pub fn handle_authn_request_as(
        &self,
        encoded_request: &str,
        relay_state: Option<&str>,
        binding: SamlBinding,
        profile: Option<&MockUserProfile>,
        now: DateTime<Utc>,
    ) -> SamlResult<SsoResponse> {
        let decoded = match binding {
            SamlBinding::HttpRedirect => HttpRedirectBinding::decode_with_limit(
                Some(encoded_request),
                None,
                relay_state,
                None,
                None,
                self.config.max_decoded_len,
            )?,
            SamlBinding::HttpPost => HttpPostBinding::decode_with_limit(
                Some(encoded_request),
                None,
                relay_state,
                self.config.max_decoded_len,
            )?,
        };

        let request = match AuthnRequest::from_xml(&decoded.xml) {
            Ok(request) => request,
            Err(err) => {
                // No session gets created for a malformed request. The
                // error response still needs somewhere to go; without a
                // readable ACS URL the failure stays hard.
                warn!(code = err.code(), "rejecting malformed AuthnRequest");
                let Some(acs_url) = AuthnRequest::extract_acs_url(&decoded.xml) else {
                    return Err(err);
                };
                return self.error_response(&acs_url, None, relay_state, &err, now);
            }
        };

        debug!(
            request_id = %request.id,
            issuer = %request.issuer,
            "handling AuthnRequest"
        );

        if let Err(err) = self.track(&request, now) {
            if err.is_transport() || err.is_fatal() {
                return Err(err);
            }
            return self.error_response(
                &request.assertion_consumer_service_url,
                Some(&request.id),
                relay_state,
                &err,
                now,
            );
        }

        let profile = profile.unwrap_or(&self.config.user);

        let response = self.build_success_response(&request, profile, now);
        let signed_xml = self.signer.sign(&response.to_xml(), &response.id)?;

        self.tracker.complete(
            &request.id,
            profile.name_id(),
            profile.attributes.clone(),
            now,
        )?;

        info!(
            request_id = %request.id,
            issuer = %request.issuer,
            subject = %profile.email,
            "login completed"
        );

        let html = HttpPostBinding::encode_response(
            &signed_xml,
            &request.assertion_consumer_service_url,
            relay_state,
        );

        Ok(SsoResponse {
            destination: request.assertion_consumer_service_url,
            relay_state: relay_state.map(String::from),
            response_xml: signed_xml,
            html,
            error_code: None,
        })
    }

    /// Expires pending sessions older than their lifetime.
    pub fn sweep_sessions(&self, now: DateTime<Utc>) -> SamlResult<usize> {
        self.tracker.expire_older_than(now)
    }

    fn track(&self, request: &AuthnRequest, now: DateTime<Utc>) -> SamlResult<()> {
        // A request ID that already completed a login is a replay; any
        // other duplicate is a duplicate request.
        match self.tracker.state(&request.id, now) {
            Ok(SessionState::Completed) => {
                return Err(SamlError::Replay(request.id.clone()));
            }
            Ok(_) => {
                return Err(SamlError::DuplicateRequest(request.id.clone()));
            }
            Err(SamlError::UnknownSession(_)) => {}
            Err(err) => return Err(err),
        }

        self.tracker.create(
            &request.id,
            &request.issuer,
            &request.assertion_consumer_service_url,
            now,
        )?;
        Ok(())
    }

    fn build_success_response(
        &self,
        request: &AuthnRequest,
        profile: &MockUserProfile,
        now: DateTime<Utc>,
    ) -> Response {
        let lifetime = self.config.assertion_lifetime();

        let subject = Subject::new(profile.name_id()).with_confirmation(
            SubjectConfirmation::bearer(
                &request.id,
                &request.assertion_consumer_service_url,
                now + lifetime,
            ),
        );

        let mut assertion = Assertion::new(&self.config.entity_id, subject, now)
            .with_conditions(
                Conditions::with_lifetime(now, lifetime).with_audience(&request.issuer),
            )
            .with_authn_statement(AuthnStatement::password(now));
        for attribute in profile.saml_attributes() {
            assertion = assertion.with_attribute(attribute);
        }

        Response::success(&self.config.entity_id, now)
            .in_response_to(&request.id)
            .with_destination(&request.assertion_consumer_service_url)
            .with_assertion(assertion)
    }

    fn error_response(
        &self,
        acs_url: &str,
        in_response_to: Option<&str>,
        relay_state: Option<&str>,
        err: &SamlError,
        now: DateTime<Utc>,
    ) -> SamlResult<SsoResponse> {
        let status = Status::from_code(err.status_code(), Some(err.to_string()));
        let mut response = Response::error(&self.config.entity_id, now, status)
            .with_destination(acs_url);
        if let Some(request_id) = in_response_to {
            response = response.in_response_to(request_id);
        }

        let signed_xml = self.signer.sign(&response.to_xml(), &response.id)?;
        let html = HttpPostBinding::encode_response(&signed_xml, acs_url, relay_state);

        Ok(SsoResponse {
            destination: acs_url.to_string(),
            relay_state: relay_state.map(String::from),
            response_xml: signed_xml,
            html,
            error_code: Some(err.code()),
        })
    }
}
