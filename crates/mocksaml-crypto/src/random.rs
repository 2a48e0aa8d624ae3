//! Cryptographically secure random generation for protocol identifiers.
//!
//! Used for session indexes and transient name identifiers. All functions
//! use the thread-local generator, which is cryptographically secure.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates `len` cryptographically secure random bytes.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a random alphanumeric string of length `len`.
///
/// Suitable for session indexes and other opaque protocol tokens; at
/// 32 characters this carries ~190 bits of entropy.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}
