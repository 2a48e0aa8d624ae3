//! Single Sign-On endpoint.
//!
//! Accepts SAML AuthnRequest messages over both front-channel bindings
//! and replies with an auto-submitting POST form carrying the signed
//! Response. Protocol-level failures also come back as signed Responses
//! posted to the SP; only transport and signing failures surface as
//! plain HTTP errors.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Form,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::SamlError;
use crate::types::SamlBinding;

use super::IdpState;

/// Query parameters for SSO redirect binding.
#[derive(Debug, Deserialize)]
pub struct SsoRedirectParams {
    /// The SAML request (deflated, base64, URL-encoded).
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,

    /// Relay state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,

    /// Detached signature (if signed).
    #[serde(rename = "Signature")]
    pub signature: Option<String>,

    /// Signature algorithm.
    #[serde(rename = "SigAlg")]
    pub sig_alg: Option<String>,
}

/// Form data for SSO POST binding.
#[derive(Debug, Deserialize)]
pub struct SsoPostForm {
    /// The SAML request (base64-encoded).
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,

    /// Relay state.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// GET handler for the SSO endpoint (HTTP-Redirect binding).
pub async fn sso_redirect(
    State(state): State<IdpState>,
    Query(params): Query<SsoRedirectParams>,
) -> impl IntoResponse {
    match handle_sso_redirect(&state, params) {
        Ok(response) => response.into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST handler for the SSO endpoint (HTTP-POST binding).
pub async fn sso_post(
    State(state): State<IdpState>,
    Form(form): Form<SsoPostForm>,
) -> impl IntoResponse {
    match handle_sso_post(&state, form) {
        Ok(response) => response.into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// Handles SSO via HTTP-Redirect binding.
fn handle_sso_redirect(
    state: &IdpState,
    params: SsoRedirectParams,
) -> Result<Html<String>, SamlError> {
    let saml_request = params
        .saml_request
        .ok_or_else(|| SamlError::Transport("SAMLRequest parameter required".to_string()))?;

    let outcome = state.engine.handle_authn_request(
        &saml_request,
        params.relay_state.as_deref(),
        SamlBinding::HttpRedirect,
        Utc::now(),
    )?;

    Ok(Html(outcome.html))
}

/// Handles SSO via HTTP-POST binding.
fn handle_sso_post(state: &IdpState, form: SsoPostForm) -> Result<Html<String>, SamlError> {
    let saml_request = form
        .saml_request
        .ok_or_else(|| SamlError::Transport("SAMLRequest parameter required".to_string()))?;

    let outcome = state.engine.handle_authn_request(
        &saml_request,
        form.relay_state.as_deref(),
        SamlBinding::HttpPost,
        Utc::now(),
    )?;

    Ok(Html(outcome.html))
}

/// Renders a hard failure as a plain HTTP error page.
fn error_response(err: &SamlError) -> (StatusCode, Html<String>) {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>SAML Error</title></head>
<body>
<h1>SAML Error</h1>
<p>{}</p>
</body>
</html>"#,
        err
    );
    (status, Html(html))
}
