//! XML-DSig enveloped signatures for SAML messages.
//!
//! The signer and validator agree on one canonical form: the exact
//! octets the serializer produced. Messages are serialized
//! deterministically, signed last, and never reserialized afterwards, so
//! no whitespace or attribute-order normalization is applied on either
//! side. Flipping any byte of a signed document breaks verification.
//!
//! Supported algorithms are RSA PKCS#1 v1.5 with SHA-256 (default),
//! SHA-384, and SHA-512. Verification fails closed: unknown algorithms
//! and absent signatures are rejected, never skipped.

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use mocksaml_crypto::RsaAlgorithm;

use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (default).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the XML-DSig URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
        }
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 => digest_algorithms::SHA512,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            _ => None,
        }
    }

    pub(crate) const fn rsa(self) -> RsaAlgorithm {
        match self {
            Self::RsaSha256 => RsaAlgorithm::Sha256,
            Self::RsaSha384 => RsaAlgorithm::Sha384,
            Self::RsaSha512 => RsaAlgorithm::Sha512,
        }
    }

    pub(crate) fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::RsaSha256 => mocksaml_crypto::sha256(data),
            Self::RsaSha384 => mocksaml_crypto::sha384(data),
            Self::RsaSha512 => mocksaml_crypto::sha512(data),
        }
    }
}

/// The canonicalization URI advertised in SignedInfo.
///
/// Advertised for interoperability with SP-side tooling; both sides of
/// this implementation operate on the exact serialized octets.
pub const CANONICALIZATION_URI: &str = canonicalization_algorithms::EXCLUSIVE_C14N;

/// A parsed `<ds:Signature>` element.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The reference URI, typically `#` plus the signed element's ID.
    pub reference_uri: String,
    /// The digest value, base64 encoded.
    pub digest_value: String,
    /// The signature value, base64 encoded.
    pub signature_value: String,
    /// Embedded X.509 certificate, base64 DER, if present.
    pub x509_certificate: Option<String>,
}

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// Whether to embed the X.509 certificate in KeyInfo.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaSha256,
            include_certificate: true,
        }
    }
}

impl SignatureConfig {
    /// Creates a configuration with the given algorithm.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            include_certificate: true,
        }
    }
}
