//! HTTP endpoint tests.
//!
//! Exercises the axum router in-process with `tower::ServiceExt::oneshot`,
//! no listening socket needed.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mocksaml_idp::endpoints::{idp_router, IdpState};
use mocksaml_idp::engine::FlowEngine;
use mocksaml_idp::IdpConfig;

const IDP_KEY: &str = include_str!("fixtures/idp-key.pem");
const IDP_CERT: &str = include_str!("fixtures/idp-cert.pem");

fn test_app() -> axum::Router {
    let config = IdpConfig::new(
        "https://mock-idp.example.com",
        "https://mock-idp.example.com",
        IDP_KEY,
        IDP_CERT,
    );
    let engine = FlowEngine::new(config).unwrap();
    idp_router().with_state(IdpState::new(engine))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn metadata_endpoint_serves_descriptor() {
    let app = test_app();

    let response = app
        .oneshot(Request::get("/metadata").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/samlmetadata+xml"
    );

    let body = body_string(response).await;
    assert!(body.contains(r#"entityID="https://mock-idp.example.com""#));
    assert!(body.contains(r#"Location="https://mock-idp.example.com/sso""#));
    assert!(body.contains("<ds:X509Certificate>"));
}

#[tokio::test]
async fn sso_post_returns_auto_submit_form() {
    let app = test_app();

    let xml = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="req-http-1" Version="2.0" IssueInstant="2026-03-14T09:29:58Z" AssertionConsumerServiceURL="https://sp.example.com/acs"><saml:Issuer>https://sp.example.com</saml:Issuer></samlp:AuthnRequest>"#;
    let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
    let form = format!(
        "SAMLRequest={}&RelayState=abc",
        urlencoding::encode(&encoded)
    );

    let response = app
        .oneshot(
            Request::post("/sso")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(r#"action="https://sp.example.com/acs""#));
    assert!(body.contains(r#"name="SAMLResponse""#));
    assert!(body.contains(r#"name="RelayState" value="abc""#));
}

#[tokio::test]
async fn sso_get_without_request_is_bad_request() {
    let app = test_app();

    let response = app
        .oneshot(Request::get("/sso").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sso_get_with_garbage_payload_is_bad_request() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::get("/sso?SAMLRequest=%21%21garbage%21%21")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
