//! RSA PKCS#1 v1.5 signing and verification.
//!
//! SAML 2.0 XML-DSig in the wild is overwhelmingly RSA with SHA-2
//! digests over PKCS#1 v1.5 padding; this module covers that set and
//! nothing else.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    self, RsaKeyPair, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384,
    RSA_PKCS1_2048_8192_SHA512,
};
use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The supplied key material could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The signing operation itself failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// RSA signature algorithms supported for SAML messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    Sha256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    Sha384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    Sha512,
}

impl RsaAlgorithm {
    /// Returns the XML-DSig algorithm URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Sha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Sha512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }
}

/// Signs `data` with an RSA private key in DER format (PKCS#1 or PKCS#8).
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the key cannot be parsed and
/// [`CryptoError::Signing`] if the signing operation fails.
pub fn rsa_sign(key_der: &[u8], data: &[u8], algorithm: RsaAlgorithm) -> Result<Vec<u8>, CryptoError> {
    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];

    let padding = match algorithm {
        RsaAlgorithm::Sha256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Sha384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Sha512 => &signature::RSA_PKCS1_SHA512,
    };

    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA signature against a public key in DER format
/// (`SubjectPublicKeyInfo` or PKCS#1).
///
/// Returns `Ok(false)` on a mismatched signature; `Err` is reserved for
/// unusable inputs.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<bool, CryptoError> {
    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Sha256 => &RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Sha384 => &RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Sha512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
