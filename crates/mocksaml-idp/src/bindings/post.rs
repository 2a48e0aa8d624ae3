//! HTTP-POST binding.
//!
//! Messages are base64-encoded and carried in a hidden form field of an
//! auto-submitting HTML page. RelayState rides along as a second hidden
//! field, untouched.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML request as an auto-submitting HTML form.
    #[must_use]
    pub fn encode_request(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode(xml, destination, relay_state, SamlMessageType::Request)
    }

    /// Encodes a SAML response as an auto-submitting HTML form.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode(xml, destination, relay_state, SamlMessageType::Response)
    }

    fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            message_type.form_param(),
            encoded,
            relay_state_input
        )
    }

    /// Decodes a SAML message from POST form field values.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        Self::decode_with_limit(
            saml_request,
            saml_response,
            relay_state,
            super::DEFAULT_MAX_DECODED_LEN,
        )
    }

    /// Decodes a SAML message, capping the decoded size.
    pub fn decode_with_limit(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        max_decoded_len: usize,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SamlError::Transport(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        if decoded.len() > max_decoded_len {
            return Err(SamlError::Transport(format!(
                "decoded message exceeds {max_decoded_len} byte limit"
            )));
        }
        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::Transport(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: None,
            sig_alg: None,
        })
    }
}

/// Escapes HTML special characters for form attribute values.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
