//! HTTP-Redirect binding.
//!
//! Messages are DEFLATE-compressed (raw stream, no zlib header), base64
//! encoded, then URL-encoded into query parameters. Redirect-binding
//! signatures are detached, carried in SigAlg and Signature parameters
//! over the query string rather than inside the XML.

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType, DEFAULT_MAX_DECODED_LEN};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a SAML request into a redirect URL.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        Self::encode(xml, destination, relay_state, SamlMessageType::Request)
    }

    /// Encodes a SAML response into a redirect URL.
    pub fn encode_response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        Self::encode(xml, destination, relay_state, SamlMessageType::Response)
    }

    fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&compressed);
        let url_encoded = urlencoding::encode(&encoded);

        let separator = if destination.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}{}={}",
            destination,
            separator,
            message_type.form_param(),
            url_encoded
        );
        if let Some(rs) = relay_state {
            url.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }
        Ok(url)
    }

    /// Encodes a signed SAML request into a redirect URL.
    ///
    /// The signature covers the query string, not the XML; the caller
    /// computes it over [`Self::extract_signed_query`] output.
    pub fn encode_signed_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        sig_alg: &str,
        signature: &str,
    ) -> SamlResult<String> {
        let mut url = Self::encode_request(xml, destination, relay_state)?;
        url.push_str(&format!("&SigAlg={}", urlencoding::encode(sig_alg)));
        url.push_str(&format!("&Signature={}", urlencoding::encode(signature)));
        Ok(url)
    }

    /// Decodes a SAML message from redirect query parameter values.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        Self::decode_with_limit(
            saml_request,
            saml_response,
            relay_state,
            signature,
            sig_alg,
            DEFAULT_MAX_DECODED_LEN,
        )
    }

    /// Decodes a SAML message, capping the decompressed size.
    pub fn decode_with_limit(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
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

        // The web framework may have URL-decoded already; decoding a
        // base64 payload a second time is a no-op.
        let url_decoded = urlencoding::decode(encoded)
            .map_err(|e| SamlError::Transport(format!("URL decode error: {e}")))?;

        let b64_decoded = base64::engine::general_purpose::STANDARD.decode(url_decoded.as_ref())?;

        let xml_bytes = deflate_decompress(&b64_decoded, max_decoded_len)?;

        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::Transport(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: signature.map(String::from),
            sig_alg: sig_alg.map(String::from),
        })
    }

    /// Decodes a message from a full redirect URL.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::Transport(format!("invalid URL: {e}")))?;

        let mut saml_request = None;
        let mut saml_response = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" => saml_request = Some(value.to_string()),
                "SAMLResponse" => saml_response = Some(value.to_string()),
                "RelayState" => relay_state = Some(value.to_string()),
                "Signature" => signature = Some(value.to_string()),
                "SigAlg" => sig_alg = Some(value.to_string()),
                _ => {}
            }
        }

        Self::decode(
            saml_request.as_deref(),
            saml_response.as_deref(),
            relay_state.as_deref(),
            signature.as_deref(),
            sig_alg.as_deref(),
        )
    }

    /// Extracts the query-string portion covered by a detached signature.
    ///
    /// That is SAMLRequest or SAMLResponse, RelayState if present, and
    /// SigAlg, in that order, with values re-URL-encoded. The Signature
    /// parameter itself is excluded.
    pub fn extract_signed_query(url: &str) -> SamlResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::Transport(format!("invalid URL: {e}")))?;

        let mut parts = Vec::new();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" | "SAMLResponse" | "RelayState" | "SigAlg" => {
                    parts.push(format!("{}={}", key, urlencoding::encode(&value)));
                }
                _ => {}
            }
        }

        if parts.is_empty() {
            return Err(SamlError::Transport("no SAML parameters found".to_string()));
        }
        Ok(parts.join("&"))
    }
}

/// Compresses data as a raw DEFLATE stream.
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses a raw DEFLATE stream, refusing output beyond `max_len`.
fn deflate_decompress(data: &[u8], max_len: usize) -> SamlResult<Vec<u8>> {
    let decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    // Read one byte past the cap to tell "exactly at cap" from "over it".
    let read = decoder
        .take(max_len as u64 + 1)
        .read_to_end(&mut decompressed)?;
    if read > max_len {
        return Err(SamlError::Transport(format!(
            "decoded message exceeds {max_len} byte limit"
        )));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode_request() {
        let xml = r#"<samlp:AuthnRequest ID="req-1">payload</samlp:AuthnRequest>"#;
        let url = HttpRedirectBinding::encode_request(
            xml,
            "https://idp.example.com/sso",
            Some("state123"),
        )
        .unwrap();

        assert!(url.starts_with("https://idp.example.com/sso?"));
        assert!(url.contains("SAMLRequest="));
        assert!(url.contains("RelayState=state123"));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Request);
        assert_eq!(decoded.relay_state.as_deref(), Some("state123"));
    }

    #[test]
    fn relay_state_survives_url_metacharacters() {
        let xml = "<Test/>";
        let state = "page=/dash?tab=a&b 2";
        let url = HttpRedirectBinding::encode_request(xml, "https://idp.example.com/sso", Some(state))
            .unwrap();
        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.relay_state.as_deref(), Some(state));
    }

    #[test]
    fn decode_rejects_bad_base64() {
        let err =
            HttpRedirectBinding::decode(Some("!!!not-base64!!!"), None, None, None, None)
                .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn decode_rejects_garbage_deflate() {
        let garbage = base64::engine::general_purpose::STANDARD.encode(b"\xff\xfe\xfd\xfc");
        let err = HttpRedirectBinding::decode(Some(&garbage), None, None, None, None).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn decode_enforces_size_cap() {
        let xml = "a".repeat(4096);
        let url = HttpRedirectBinding::encode_request(&xml, "https://idp.example.com/sso", None)
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let encoded = parsed
            .query_pairs()
            .find(|(k, _)| k == "SAMLRequest")
            .map(|(_, v)| v.to_string())
            .unwrap();

        let err = HttpRedirectBinding::decode_with_limit(
            Some(&encoded),
            None,
            None,
            None,
            None,
            1024,
        )
        .unwrap_err();
        assert!(err.is_transport());

        // Exactly at the cap decodes fine.
        let ok = HttpRedirectBinding::decode_with_limit(
            Some(&encoded),
            None,
            None,
            None,
            None,
            4096,
        )
        .unwrap();
        assert_eq!(ok.xml.len(), 4096);
    }

    #[test]
    fn deflate_roundtrip() {
        let original = b"test data for compression";
        let compressed = deflate_compress(original).unwrap();
        let decompressed = deflate_decompress(&compressed, DEFAULT_MAX_DECODED_LEN).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn extract_signed_query_excludes_signature() {
        let url = "https://idp.example.com/sso?SAMLRequest=abc&RelayState=xyz&SigAlg=rsa-sha256&Signature=sig";
        let query = HttpRedirectBinding::extract_signed_query(url).unwrap();

        assert!(query.contains("SAMLRequest="));
        assert!(query.contains("RelayState="));
        assert!(query.contains("SigAlg="));
        assert!(!query.contains("Signature="));
    }

    #[test]
    fn url_with_existing_query() {
        let url = HttpRedirectBinding::encode_request(
            "<Test/>",
            "https://idp.example.com/sso?existing=param",
            None,
        )
        .unwrap();
        assert!(url.contains("?existing=param&SAMLRequest="));
    }
}
