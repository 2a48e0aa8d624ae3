//! IdP metadata endpoint.
//!
//! Generates SAML 2.0 metadata describing this Identity Provider so
//! that Service Providers can be pointed at it without hand-editing
//! entity IDs, endpoint URLs, or certificates.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use base64::Engine;

use crate::config::IdpConfig;
use crate::error::SamlError;
use crate::types::SamlBinding;

use super::IdpState;

/// GET handler for the IdP metadata endpoint.
pub async fn idp_metadata(State(state): State<IdpState>) -> impl IntoResponse {
    match generate_metadata(state.engine.config()) {
        Ok(metadata) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/samlmetadata+xml")],
            metadata,
        )
            .into_response(),
        Err(e) => (
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            e.to_string(),
        )
            .into_response(),
    }
}

/// Generates IdP metadata XML from the configured identity and certificate.
pub fn generate_metadata(config: &IdpConfig) -> Result<String, SamlError> {
    let certificate_der = mocksaml_crypto::pem_to_der(&config.certificate_pem, "CERTIFICATE")
        .ok_or_else(|| SamlError::Internal("certificate PEM could not be decoded".to_string()))?;
    let certificate_b64 = base64::engine::general_purpose::STANDARD.encode(&certificate_der);

    let sso_url = config.sso_url();

    let metadata = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
    <md:IDPSSODescriptor WantAuthnRequestsSigned="false" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
                <ds:X509Data>
                    <ds:X509Certificate>{}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>
        <md:NameIDFormat>urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress</md:NameIDFormat>
        <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:transient</md:NameIDFormat>
        <md:NameIDFormat>urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified</md:NameIDFormat>
        <md:SingleSignOnService Binding="{}" Location="{}"/>
        <md:SingleSignOnService Binding="{}" Location="{}"/>
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
        crate::types::xml_escape(&config.entity_id),
        certificate_b64,
        SamlBinding::HttpPost.uri(),
        sso_url,
        SamlBinding::HttpRedirect.uri(),
        sso_url
    );

    Ok(metadata)
}
