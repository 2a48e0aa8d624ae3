//! XML signature validation.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::signer::build_signed_info;
use super::{SignatureAlgorithm, XmlSignature};

/// XML signature validator.
///
/// Verifies enveloped signatures against a set of trusted certificates.
/// Fails closed: documents without a signature, signatures with unknown
/// algorithms, and untrusted certificates are all rejected.
pub struct XmlSignatureValidator {
    /// Trusted certificates in DER form.
    trusted_certificates: Vec<Vec<u8>>,
}

impl XmlSignatureValidator {
    /// Creates a validator trusting the given DER certificates.
    #[must_use]
    pub fn new(trusted_certificates: Vec<Vec<u8>>) -> Self {
        Self {
            trusted_certificates,
        }
    }

    /// Creates a validator from PEM-encoded certificates.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let mut certs = Vec::new();
        for pem in certificates_pem {
            let der = mocksaml_crypto::pem_to_der(pem, "CERTIFICATE").ok_or_else(|| {
                SamlError::Internal("invalid trusted certificate PEM".to_string())
            })?;
            certs.push(der);
        }
        Ok(Self::new(certs))
    }

    /// Validates the enveloped signature of an XML document.
    ///
    /// Checks the digest over the referenced element's exact octets
    /// (with the Signature element removed) and the signature over the
    /// rebuilt SignedInfo.
    pub fn validate(&self, xml: &str) -> SamlResult<XmlSignature> {
        let signature = extract_signature(xml)?;
        let cert = self.select_certificate(&signature)?;

        self.verify_digest(xml, &signature)?;
        self.verify_signature(&signature, &cert)?;

        Ok(signature)
    }

    /// Validates a detached redirect-binding signature.
    ///
    /// `signed_query` is the portion of the query string the signature
    /// covers, as produced by
    /// [`crate::bindings::HttpRedirectBinding::extract_signed_query`].
    pub fn validate_redirect_binding(
        &self,
        signed_query: &str,
        signature_b64: &str,
        sig_alg: &str,
    ) -> SamlResult<()> {
        let algorithm = SignatureAlgorithm::from_uri(sig_alg).ok_or_else(|| {
            SamlError::SignatureInvalid(format!("unknown signature algorithm: {sig_alg}"))
        })?;

        let signature = base64::engine::general_purpose::STANDARD
            .decode(signature_b64)
            .map_err(|e| SamlError::SignatureInvalid(format!("invalid signature encoding: {e}")))?;

        for cert_der in &self.trusted_certificates {
            if verify_with_cert(signed_query.as_bytes(), &signature, cert_der, algorithm).is_ok() {
                return Ok(());
            }
        }
        Err(SamlError::SignatureInvalid(
            "signature did not verify against any trusted certificate".to_string(),
        ))
    }

    fn select_certificate(&self, signature: &XmlSignature) -> SamlResult<Vec<u8>> {
        if let Some(cert_b64) = &signature.x509_certificate {
            let cert_der = base64::engine::general_purpose::STANDARD
                .decode(cert_b64)
                .map_err(|e| {
                    SamlError::SignatureInvalid(format!("invalid certificate encoding: {e}"))
                })?;

            // An embedded certificate must match a trusted one; it is
            // attacker-controlled data otherwise.
            if self.trusted_certificates.iter().any(|tc| tc == &cert_der) {
                return Ok(cert_der);
            }
            return Err(SamlError::SignatureInvalid(
                "embedded certificate is not trusted".to_string(),
            ));
        }

        self.trusted_certificates.first().cloned().ok_or_else(|| {
            SamlError::SignatureInvalid("no trusted certificate configured".to_string())
        })
    }

    fn verify_digest(&self, xml: &str, signature: &XmlSignature) -> SamlResult<()> {
        let reference_id = signature
            .reference_uri
            .strip_prefix('#')
            .unwrap_or(&signature.reference_uri);

        let element = extract_referenced_element(xml, reference_id)?;
        let element_without_sig = remove_signature_element(&element);

        let digest = signature.algorithm.digest(element_without_sig.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        if digest_b64 != signature.digest_value {
            return Err(SamlError::SignatureInvalid("digest mismatch".to_string()));
        }
        Ok(())
    }

    fn verify_signature(&self, signature: &XmlSignature, cert_der: &[u8]) -> SamlResult<()> {
        let signed_info = build_signed_info(
            &signature.reference_uri,
            &signature.digest_value,
            signature.algorithm,
        );

        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(&signature.signature_value)
            .map_err(|e| SamlError::SignatureInvalid(format!("invalid signature encoding: {e}")))?;

        verify_with_cert(
            signed_info.as_bytes(),
            &signature_bytes,
            cert_der,
            signature.algorithm,
        )
    }
}

/// Verifies a raw signature using the public key of a certificate.
fn verify_with_cert(
    data: &[u8],
    signature: &[u8],
    cert_der: &[u8],
    algorithm: SignatureAlgorithm,
) -> SamlResult<()> {
    let spki = extract_public_key(cert_der)?;
    let valid = mocksaml_crypto::rsa_verify(&spki, data, signature, algorithm.rsa())
        .map_err(|e| SamlError::SignatureInvalid(format!("verification error: {e}")))?;
    if valid {
        Ok(())
    } else {
        Err(SamlError::SignatureInvalid(
            "signature verification failed".to_string(),
        ))
    }
}

/// Extracts the SubjectPublicKeyInfo DER from an X.509 certificate.
fn extract_public_key(cert_der: &[u8]) -> SamlResult<Vec<u8>> {
    use x509_parser::prelude::*;

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| SamlError::SignatureInvalid(format!("unparseable certificate: {e}")))?;
    Ok(cert.public_key().raw.to_vec())
}

/// Parses the `<ds:Signature>` element out of a document.
fn extract_signature(xml: &str) -> SamlResult<XmlSignature> {
    if !xml.contains("<ds:Signature") && !xml.contains("<Signature") {
        return Err(SamlError::SignatureInvalid(
            "document carries no Signature element".to_string(),
        ));
    }

    let algorithm = extract_attribute(xml, "SignatureMethod", "Algorithm")
        .and_then(|uri| SignatureAlgorithm::from_uri(&uri))
        .ok_or_else(|| {
            SamlError::SignatureInvalid("unsupported or missing signature algorithm".to_string())
        })?;

    let reference_uri = extract_attribute(xml, "Reference", "URI")
        .ok_or_else(|| SamlError::SignatureInvalid("no Reference URI found".to_string()))?;

    let digest_value = extract_element_content(xml, "DigestValue")
        .ok_or_else(|| SamlError::SignatureInvalid("no DigestValue found".to_string()))?;

    let signature_value = extract_element_content(xml, "SignatureValue")
        .ok_or_else(|| SamlError::SignatureInvalid("no SignatureValue found".to_string()))?;

    let x509_certificate = extract_element_content(xml, "X509Certificate");

    Ok(XmlSignature {
        algorithm,
        reference_uri,
        digest_value: strip_whitespace(&digest_value),
        signature_value: strip_whitespace(&signature_value),
        x509_certificate: x509_certificate.as_deref().map(strip_whitespace),
    })
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Extracts an attribute value from the first matching element.
fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    for pattern in [format!("<ds:{element}"), format!("<{element}")] {
        if let Some(pos) = xml.find(&pattern) {
            let end = xml[pos..].find('>')?;
            let element_str = &xml[pos..pos + end];

            let attr_pattern = format!("{attribute}=\"");
            if let Some(attr_start) = element_str.find(&attr_pattern) {
                let value_start = attr_start + attr_pattern.len();
                let value_end = element_str[value_start..].find('"')?;
                return Some(element_str[value_start..value_start + value_end].to_string());
            }
        }
    }
    None
}

/// Extracts the text content of the first matching element.
fn extract_element_content(xml: &str, element: &str) -> Option<String> {
    for (open, close) in [
        (format!("<ds:{element}>"), format!("</ds:{element}>")),
        (format!("<{element}>"), format!("</{element}>")),
    ] {
        if let Some(start) = xml.find(&open) {
            let content_start = start + open.len();
            if let Some(end) = xml[content_start..].find(&close) {
                return Some(xml[content_start..content_start + end].to_string());
            }
        }
    }
    None
}

/// Extracts the element carrying `ID="reference_id"`, octets untouched.
fn extract_referenced_element(xml: &str, reference_id: &str) -> SamlResult<String> {
    let id_attr = format!(r#"ID="{reference_id}""#);
    let id_pos = xml.find(&id_attr).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("referenced element '{reference_id}' not found"))
    })?;

    let tag_start = xml[..id_pos]
        .rfind('<')
        .ok_or_else(|| SamlError::SignatureInvalid("malformed XML element".to_string()))?;

    let name_end = xml[tag_start + 1..]
        .find(|c: char| c == ' ' || c == '>' || c == '/')
        .map(|pos| tag_start + 1 + pos)
        .ok_or_else(|| SamlError::SignatureInvalid("malformed XML element".to_string()))?;
    let tag_name = &xml[tag_start + 1..name_end];

    let close_tag = format!("</{tag_name}>");
    let element_end = xml[tag_start..]
        .find(&close_tag)
        .map(|pos| tag_start + pos + close_tag.len())
        .ok_or_else(|| {
            SamlError::SignatureInvalid("referenced element is not properly closed".to_string())
        })?;

    Ok(xml[tag_start..element_end].to_string())
}

/// Removes the first Signature element, leaving every other octet as is.
fn remove_signature_element(xml: &str) -> String {
    for (open, close) in [
        ("<ds:Signature", "</ds:Signature>"),
        ("<Signature", "</Signature>"),
    ] {
        if let Some(start) = xml.find(open) {
            if let Some(end_offset) = xml[start..].find(close) {
                let end = start + end_offset + close.len();
                return format!("{}{}", &xml[..start], &xml[end..]);
            }
        }
    }
    xml.to_string()
}
