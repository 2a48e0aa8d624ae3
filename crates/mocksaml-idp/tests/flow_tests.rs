//! End-to-end flow tests for the mock IdP.
//!
//! Drives encoded AuthnRequests through the engine under simulated time
//! and checks the signed responses the way an SP under test would: by
//! decoding the POST form, verifying the signature, and inspecting the
//! response content.

use std::io::Write;

use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use flate2::write::DeflateEncoder;
use flate2::Compression;

use mocksaml_idp::bindings::HttpPostBinding;
use mocksaml_idp::engine::FlowEngine;
use mocksaml_idp::signature::XmlSignatureValidator;
use mocksaml_idp::{IdpConfig, SamlBinding, SamlError};

const IDP_KEY: &str = include_str!("fixtures/idp-key.pem");
const IDP_CERT: &str = include_str!("fixtures/idp-cert.pem");

const SP_ENTITY_ID: &str = "https://sp.example.com";
const ACS_URL: &str = "https://sp.example.com/acs";

fn test_engine() -> FlowEngine {
    let config = IdpConfig::new(
        "https://mock-idp.example.com",
        "https://mock-idp.example.com",
        IDP_KEY,
        IDP_CERT,
    );
    FlowEngine::new(config).unwrap()
}

fn test_engine_with_session_lifetime(secs: i64) -> FlowEngine {
    let mut config = IdpConfig::new(
        "https://mock-idp.example.com",
        "https://mock-idp.example.com",
        IDP_KEY,
        IDP_CERT,
    );
    config.session_lifetime_secs = secs;
    FlowEngine::new(config).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
}

fn authn_request_xml(id: &str) -> String {
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="2026-03-14T09:29:58Z" AssertionConsumerServiceURL="{ACS_URL}"><saml:Issuer>{SP_ENTITY_ID}</saml:Issuer></samlp:AuthnRequest>"#
    )
}

/// Encodes XML the way an SP sends it over the redirect binding:
/// raw DEFLATE then base64. The engine handles URL decoding itself.
fn redirect_encode(xml: &str) -> String {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();
    base64::engine::general_purpose::STANDARD.encode(compressed)
}

fn post_encode(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml)
}

/// Pulls the base64 SAMLResponse out of an auto-submit form.
fn extract_form_field(html: &str, name: &str) -> Option<String> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

fn decode_response_xml(html: &str) -> String {
    let encoded = extract_form_field(html, "SAMLResponse").expect("form carries SAMLResponse");
    let decoded = HttpPostBinding::decode(None, Some(&encoded), None).unwrap();
    decoded.xml
}

#[test]
fn post_binding_login_produces_verifiable_response() {
    let engine = test_engine();
    let encoded = post_encode(&authn_request_xml("req-1"));

    let outcome = engine
        .handle_authn_request(&encoded, Some("state-42"), SamlBinding::HttpPost, t0())
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.destination, ACS_URL);
    assert_eq!(outcome.relay_state.as_deref(), Some("state-42"));

    // The form posts to the ACS and echoes RelayState untouched.
    assert!(outcome.html.contains(&format!(r#"action="{ACS_URL}""#)));
    assert_eq!(
        extract_form_field(&outcome.html, "RelayState").as_deref(),
        Some("state-42")
    );

    let response_xml = decode_response_xml(&outcome.html);
    assert_eq!(response_xml, outcome.response_xml);

    // Signature verifies against the published certificate.
    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT]).unwrap();
    validator.validate(&response_xml).unwrap();

    assert!(response_xml.contains(r#"InResponseTo="req-1""#));
    assert!(response_xml.contains("urn:oasis:names:tc:SAML:2.0:status:Success"));
    assert!(response_xml.contains(&format!("<saml:Audience>{SP_ENTITY_ID}</saml:Audience>")));
    assert!(response_xml.contains("testuser@example.com"));
    assert!(response_xml.contains(r#"Name="displayName""#));
}

#[test]
fn redirect_binding_login_produces_verifiable_response() {
    let engine = test_engine();
    let encoded = redirect_encode(&authn_request_xml("req-redirect"));

    let outcome = engine
        .handle_authn_request(&encoded, None, SamlBinding::HttpRedirect, t0())
        .unwrap();

    assert!(outcome.is_success());
    assert!(extract_form_field(&outcome.html, "RelayState").is_none());

    let response_xml = decode_response_xml(&outcome.html);
    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT]).unwrap();
    validator.validate(&response_xml).unwrap();
    assert!(response_xml.contains(r#"InResponseTo="req-redirect""#));
}

#[test]
fn tampered_response_fails_validation() {
    let engine = test_engine();
    let encoded = post_encode(&authn_request_xml("req-tamper"));
    let outcome = engine
        .handle_authn_request(&encoded, None, SamlBinding::HttpPost, t0())
        .unwrap();

    let tampered = outcome
        .response_xml
        .replace("testuser@example.com", "Testuser@example.com");
    assert_ne!(tampered, outcome.response_xml);

    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT]).unwrap();
    assert!(matches!(
        validator.validate(&tampered),
        Err(SamlError::SignatureInvalid(_))
    ));
}

#[test]
fn replayed_request_gets_signed_requester_error() {
    let engine = test_engine();
    let encoded = post_encode(&authn_request_xml("req-replay"));

    let first = engine
        .handle_authn_request(&encoded, None, SamlBinding::HttpPost, t0())
        .unwrap();
    assert!(first.is_success());

    let second = engine
        .handle_authn_request(&encoded, Some("rs"), SamlBinding::HttpPost, t0())
        .unwrap();
    assert_eq!(second.error_code, Some("replay"));
    assert_eq!(second.destination, ACS_URL);

    // The error is still a signed Response delivered to the ACS.
    let response_xml = decode_response_xml(&second.html);
    let validator = XmlSignatureValidator::from_pem(&[IDP_CERT]).unwrap();
    validator.validate(&response_xml).unwrap();
    assert!(response_xml.contains("urn:oasis:names:tc:SAML:2.0:status:Requester"));
    assert!(response_xml.contains(r#"InResponseTo="req-replay""#));

    // The replay did not disturb the completed session.
    assert_eq!(engine.tracker().len().unwrap(), 1);
}

#[test]
fn missing_issuer_gets_error_response_without_session() {
    let engine = test_engine();
    let xml = format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="req-bad" Version="2.0" IssueInstant="2026-03-14T09:29:58Z" AssertionConsumerServiceURL="{ACS_URL}"></samlp:AuthnRequest>"#
    );

    let outcome = engine
        .handle_authn_request(&post_encode(&xml), None, SamlBinding::HttpPost, t0())
        .unwrap();

    assert_eq!(outcome.error_code, Some("malformed_request"));
    let response_xml = decode_response_xml(&outcome.html);
    assert!(response_xml.contains("urn:oasis:names:tc:SAML:2.0:status:Requester"));
    // Malformed requests never create a session.
    assert!(engine.tracker().is_empty().unwrap());
}

#[test]
fn malformed_request_without_acs_is_a_hard_error() {
    let engine = test_engine();
    let xml = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="req-no-acs" Version="2.0" IssueInstant="2026-03-14T09:29:58Z"></samlp:AuthnRequest>"#;

    let err = engine
        .handle_authn_request(&post_encode(xml), None, SamlBinding::HttpPost, t0())
        .unwrap_err();
    assert!(matches!(err, SamlError::MalformedRequest(_)));
}

#[test]
fn garbage_base64_is_a_transport_error() {
    let engine = test_engine();
    let err = engine
        .handle_authn_request("!!not-base64!!", None, SamlBinding::HttpPost, t0())
        .unwrap_err();
    assert!(err.is_transport());
}

#[test]
fn corrupt_deflate_is_a_transport_error() {
    let engine = test_engine();
    // Valid base64, not a valid DEFLATE stream.
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"plain xml, not deflated");
    let err = engine
        .handle_authn_request(&encoded, None, SamlBinding::HttpRedirect, t0())
        .unwrap_err();
    assert!(err.is_transport());
}

#[test]
fn expired_pending_session_rejects_completion() {
    let engine = test_engine_with_session_lifetime(60);
    let tracker = engine.tracker();

    tracker
        .create("req-stale", SP_ENTITY_ID, ACS_URL, t0())
        .unwrap();

    let later = t0() + Duration::seconds(61);
    let err = tracker
        .complete(
            "req-stale",
            mocksaml_idp::NameId::email("testuser@example.com"),
            Vec::new(),
            later,
        )
        .unwrap_err();
    assert!(matches!(err, SamlError::InvalidState(_)));
}

#[test]
fn sweep_expires_stale_sessions_once() {
    let engine = test_engine_with_session_lifetime(60);
    let tracker = engine.tracker();

    tracker.create("req-a", SP_ENTITY_ID, ACS_URL, t0()).unwrap();
    tracker
        .create("req-b", SP_ENTITY_ID, ACS_URL, t0() + Duration::seconds(30))
        .unwrap();

    // Only req-a is past its lifetime at +61s.
    let swept = engine.sweep_sessions(t0() + Duration::seconds(61)).unwrap();
    assert_eq!(swept, 1);

    // Sweeping again at the same instant finds nothing new.
    let swept = engine.sweep_sessions(t0() + Duration::seconds(61)).unwrap();
    assert_eq!(swept, 0);
}

#[test]
fn relay_state_with_reserved_characters_survives_untouched() {
    let engine = test_engine();
    let relay = "a=b&c=d %2F?#";
    let encoded = post_encode(&authn_request_xml("req-relay"));

    let outcome = engine
        .handle_authn_request(&encoded, Some(relay), SamlBinding::HttpPost, t0())
        .unwrap();
    assert_eq!(outcome.relay_state.as_deref(), Some(relay));
}

#[test]
fn per_request_profile_overrides_default_user() {
    let engine = test_engine();
    let profile = mocksaml_idp::MockUserProfile {
        email: "alice@example.com".to_string(),
        attributes: vec![("role".to_string(), vec!["admin".to_string()])],
    };

    let outcome = engine
        .handle_authn_request_as(
            &post_encode(&authn_request_xml("req-alice")),
            None,
            SamlBinding::HttpPost,
            Some(&profile),
            t0(),
        )
        .unwrap();

    let response_xml = decode_response_xml(&outcome.html);
    assert!(response_xml.contains("alice@example.com"));
    assert!(response_xml.contains(r#"Name="role""#));
    assert!(!response_xml.contains("testuser@example.com"));

    let session = engine.tracker().get("req-alice", t0()).unwrap();
    assert_eq!(session.subject.unwrap().value, "alice@example.com");
    assert_eq!(session.attributes[0].0, "role");
}

#[test]
fn distinct_requests_each_complete() {
    let engine = test_engine();

    for id in ["req-x", "req-y", "req-z"] {
        let outcome = engine
            .handle_authn_request(
                &post_encode(&authn_request_xml(id)),
                None,
                SamlBinding::HttpPost,
                t0(),
            )
            .unwrap();
        assert!(outcome.is_success());
    }
    assert_eq!(engine.tracker().len().unwrap(), 3);
}
