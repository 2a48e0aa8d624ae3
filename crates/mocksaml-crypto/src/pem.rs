//! PEM handling for externally supplied key material.
//!
//! The mock receives keys and certificates as opaque PEM strings; this
//! module extracts the DER payload without interpreting it.

use base64::Engine;

/// Extracts the DER payload from a PEM block with the given label.
///
/// Returns `None` if the block is absent or the base64 payload is
/// malformed.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem.find(&end)?;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(&b64_data).ok()
}
