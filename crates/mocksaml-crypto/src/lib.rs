//! # mocksaml-crypto
//!
//! Cryptographic operations for the mock SAML IdP, built on aws-lc-rs.
//!
//! SAML 2.0 interoperability requires RSA PKCS#1 v1.5 signatures with
//! SHA-256 digests; this crate provides exactly that subset plus the
//! supporting pieces (digests, PEM handling, random identifiers). Key
//! material never leaves this crate in parsed form.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod hash;
pub mod pem;
pub mod random;
pub mod rsa;

pub use hash::{sha256, sha384, sha512};
pub use pem::pem_to_der;
pub use random::{random_alphanumeric, random_bytes};
pub use rsa::{rsa_sign, rsa_verify, CryptoError, RsaAlgorithm};
