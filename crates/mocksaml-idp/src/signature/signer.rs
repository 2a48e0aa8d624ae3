//! XML signature creation.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{SignatureAlgorithm, SignatureConfig, CANONICALIZATION_URI};

/// XML document signer.
///
/// Produces enveloped XML-DSig signatures over deterministically
/// serialized SAML messages, and detached signatures for the redirect
/// binding.
#[derive(Debug)]
pub struct XmlSigner {
    /// The private key in DER form (PKCS#1 or PKCS#8).
    private_key_der: Vec<u8>,
    /// The X.509 certificate in DER form, embedded in KeyInfo.
    certificate_der: Option<Vec<u8>>,
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a signer from DER key material.
    #[must_use]
    pub fn new(private_key_der: Vec<u8>, certificate_der: Option<Vec<u8>>) -> Self {
        Self {
            private_key_der,
            certificate_der,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a signer from PEM-encoded key and certificate.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let private_key_der = mocksaml_crypto::pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| mocksaml_crypto::pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Signing("invalid private key PEM".to_string()))?;

        let certificate_der =
            certificate_pem.and_then(|pem| mocksaml_crypto::pem_to_der(pem, "CERTIFICATE"));

        Ok(Self::new(private_key_der, certificate_der))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Signs the element of `xml` carrying `ID="reference_id"`.
    ///
    /// The digest covers the element's exact serialized octets. The
    /// `<ds:Signature>` element is inserted immediately after the
    /// element's Issuer child, and the result must not be reserialized:
    /// the signed octets are final.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let (element_range, insert_position) = locate_element(xml, reference_id)?;

        let digest = self
            .config
            .algorithm
            .digest(xml[element_range.0..element_range.1].as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        let signed_info = build_signed_info(
            &format!("#{reference_id}"),
            &digest_b64,
            self.config.algorithm,
        );

        let signature_value = self.sign_data(signed_info.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

        let signature_element = self.build_signature_element(&signed_info, &signature_b64);

        Ok(format!(
            "{}{}{}",
            &xml[..insert_position],
            signature_element,
            &xml[insert_position..]
        ))
    }

    /// Computes a detached signature for the HTTP-Redirect binding.
    ///
    /// The signature covers the query string
    /// `SAMLRequest|SAMLResponse=..&RelayState=..&SigAlg=..` with
    /// URL-encoded values, in that order. Returns the base64 signature.
    pub fn sign_redirect_binding(
        &self,
        encoded_message: &str,
        relay_state: Option<&str>,
        is_request: bool,
    ) -> SamlResult<String> {
        let param = if is_request { "SAMLRequest" } else { "SAMLResponse" };
        let mut to_sign = format!("{}={}", param, urlencoding::encode(encoded_message));
        if let Some(rs) = relay_state {
            to_sign.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }
        to_sign.push_str(&format!(
            "&SigAlg={}",
            urlencoding::encode(self.config.algorithm.uri())
        ));

        let signature = self.sign_data(to_sign.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signature))
    }

    /// Returns the configured signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.config.algorithm
    }

    fn sign_data(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        Ok(mocksaml_crypto::rsa_sign(
            &self.private_key_der,
            data,
            self.config.algorithm.rsa(),
        )?)
    }

    fn build_signature_element(&self, signed_info: &str, signature_b64: &str) -> String {
        let mut signature = format!(
            r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">{signed_info}<ds:SignatureValue>{signature_b64}</ds:SignatureValue>"#
        );
        if self.config.include_certificate {
            if let Some(cert) = &self.certificate_der {
                let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
                signature.push_str(&format!(
                    "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"
                ));
            }
        }
        signature.push_str("</ds:Signature>");
        signature
    }
}

/// Builds the SignedInfo element.
///
/// Single line, fixed attribute order. The validator rebuilds this
/// byte-for-byte from the parsed signature fields, so any change here
/// must be mirrored there.
pub(super) fn build_signed_info(
    reference_uri: &str,
    digest_b64: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    format!(
        concat!(
            r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">"#,
            r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
            r#"<ds:SignatureMethod Algorithm="{sig}"/>"#,
            r#"<ds:Reference URI="{uri}">"#,
            r#"<ds:Transforms>"#,
            r#"<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>"#,
            r#"<ds:Transform Algorithm="{c14n}"/>"#,
            r#"</ds:Transforms>"#,
            r#"<ds:DigestMethod Algorithm="{digest_alg}"/>"#,
            r#"<ds:DigestValue>{digest}</ds:DigestValue>"#,
            r#"</ds:Reference>"#,
            r#"</ds:SignedInfo>"#,
        ),
        c14n = CANONICALIZATION_URI,
        sig = algorithm.uri(),
        uri = reference_uri,
        digest_alg = algorithm.digest_uri(),
        digest = digest_b64,
    )
}

/// Finds the element with the given ID and where to insert its signature.
///
/// Returns the element's byte range and the insertion point, which is
/// immediately after the element's Issuer child when present, otherwise
/// after the opening tag.
fn locate_element(xml: &str, reference_id: &str) -> SamlResult<((usize, usize), usize)> {
    let id_attr = format!(r#"ID="{reference_id}""#);
    let id_pos = xml
        .find(&id_attr)
        .ok_or_else(|| SamlError::Signing(format!("element with ID '{reference_id}' not found")))?;

    // Walk back to the opening '<'.
    let tag_start = xml[..id_pos]
        .rfind('<')
        .ok_or_else(|| SamlError::Signing("malformed XML element".to_string()))?;

    let name_end = xml[tag_start + 1..]
        .find(|c: char| c == ' ' || c == '>' || c == '/')
        .map(|pos| tag_start + 1 + pos)
        .ok_or_else(|| SamlError::Signing("malformed XML element".to_string()))?;
    let tag_name = &xml[tag_start + 1..name_end];

    let close_tag = format!("</{tag_name}>");
    let element_end = xml[tag_start..]
        .find(&close_tag)
        .map(|pos| tag_start + pos + close_tag.len())
        .ok_or_else(|| SamlError::Signing(format!("unclosed XML element '{tag_name}'")))?;

    let open_tag_end = xml[id_pos..element_end]
        .find('>')
        .map(|pos| id_pos + pos + 1)
        .ok_or_else(|| SamlError::Signing("malformed XML element".to_string()))?;

    let insert_position = find_issuer_end(&xml[..element_end], open_tag_end).unwrap_or(open_tag_end);

    Ok(((tag_start, element_end), insert_position))
}

/// Finds the end of the first Issuer child after `after`.
fn find_issuer_end(xml: &str, after: usize) -> Option<usize> {
    for pattern in ["</saml:Issuer>", "</saml2:Issuer>", "</Issuer>"] {
        if let Some(pos) = xml[after..].find(pattern) {
            return Some(after + pos + pattern.len());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDP_KEY_PEM: &str = include_str!("../../tests/fixtures/idp-key.pem");
    const IDP_CERT_PEM: &str = include_str!("../../tests/fixtures/idp-cert.pem");

    fn sample_doc() -> &'static str {
        concat!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" "#,
            r#"xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="resp-1" Version="2.0">"#,
            "<saml:Issuer>https://idp.example.com</saml:Issuer>",
            "<samlp:Status><samlp:StatusCode Value=\"urn:oasis:names:tc:SAML:2.0:status:Success\"/></samlp:Status>",
            "</samlp:Response>",
        )
    }

    #[test]
    fn signature_inserted_after_issuer() {
        let signer = XmlSigner::from_pem(IDP_KEY_PEM, Some(IDP_CERT_PEM)).unwrap();
        let signed = signer.sign(sample_doc(), "resp-1").unwrap();

        let issuer_end = signed.find("</saml:Issuer>").unwrap() + "</saml:Issuer>".len();
        assert!(signed[issuer_end..].starts_with("<ds:Signature"));
        assert!(signed.contains("<ds:SignatureValue>"));
        assert!(signed.contains("<ds:X509Certificate>"));
        assert!(signed.contains(r##"URI="#resp-1""##));
    }

    #[test]
    fn signing_preserves_surrounding_octets() {
        let signer = XmlSigner::from_pem(IDP_KEY_PEM, None).unwrap();
        let original = sample_doc();
        let signed = signer.sign(original, "resp-1").unwrap();

        let sig_start = signed.find("<ds:Signature").unwrap();
        let sig_end = signed.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
        let stripped = format!("{}{}", &signed[..sig_start], &signed[sig_end..]);
        assert_eq!(stripped, original);
    }

    #[test]
    fn unknown_reference_id_fails() {
        let signer = XmlSigner::from_pem(IDP_KEY_PEM, None).unwrap();
        let err = signer.sign(sample_doc(), "nope").unwrap_err();
        assert_eq!(err.code(), "signing");
    }

    #[test]
    fn bad_key_pem_fails() {
        let err = XmlSigner::from_pem("not a pem", None).unwrap_err();
        assert_eq!(err.code(), "signing");
    }

    #[test]
    fn redirect_signature_is_deterministic_per_input() {
        let signer = XmlSigner::from_pem(IDP_KEY_PEM, None).unwrap();
        let a = signer
            .sign_redirect_binding("ZW5jb2RlZA==", Some("state"), true)
            .unwrap();
        let b = signer
            .sign_redirect_binding("ZW5jb2RlZA==", Some("state"), true)
            .unwrap();
        // RSA PKCS#1 v1.5 is deterministic for a fixed key and message.
        assert_eq!(a, b);
    }
}
