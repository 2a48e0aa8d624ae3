//! Error types for the mock IdP.
//!
//! Every failure category carries a stable machine-readable code so test
//! suites can discriminate failure modes without string matching, and
//! maps onto a SAML status URI for the error responses the engine emits.

use thiserror::Error;

use crate::types::status_codes;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol and transport errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Malformed transport encoding: bad base64, invalid deflate stream,
    /// invalid UTF-8, or a payload beyond the configured size cap. No
    /// well-formed request exists, so no SAML error response can be built.
    #[error("transport error: {0}")]
    Transport(String),

    /// A required field of the AuthnRequest is missing or unparseable.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A request ID that already completed a login was presented again.
    #[error("replayed request: {0}")]
    Replay(String),

    /// Two sessions were created for the same request ID.
    #[error("duplicate request id: {0}")]
    DuplicateRequest(String),

    /// No session is tracked for the request ID.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// A session transition was attempted from a state that does not
    /// permit it (e.g. completing an expired session).
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Signing failed: unusable key material or an uncanonicalizable
    /// target element. Never downgraded to an unsigned response.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature verification failed or the signature was absent or used
    /// an unsupported algorithm. Always fails closed.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// Internal error (misconfiguration, bugs).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the stable error code for this failure category.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::MalformedRequest(_) => "malformed_request",
            Self::Replay(_) => "replay",
            Self::DuplicateRequest(_) => "duplicate_request",
            Self::UnknownSession(_) => "unknown_session",
            Self::InvalidState(_) => "invalid_state",
            Self::Signing(_) => "signing",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the SAML status code URI for this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_)
            | Self::Replay(_)
            | Self::DuplicateRequest(_)
            | Self::UnknownSession(_)
            | Self::InvalidState(_)
            | Self::SignatureInvalid(_) => status_codes::REQUESTER,
            Self::Transport(_) | Self::Signing(_) | Self::Internal(_) => status_codes::RESPONDER,
        }
    }

    /// Returns true if the failure happened below the protocol layer, so
    /// no well-formed SAML error response can be produced for it.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the failure is a trust/configuration problem that
    /// must never be converted into an unsigned response.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Signing(_) | Self::Internal(_))
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Transport(_) | Self::MalformedRequest(_) => 400,
            Self::SignatureInvalid(_) => 401,
            Self::Replay(_) | Self::DuplicateRequest(_) | Self::InvalidState(_) => 409,
            Self::UnknownSession(_) => 404,
            Self::Signing(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedRequest(format!("XML parsing error: {err}"))
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Transport(format!("base64 decode error: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(format!("deflate error: {err}"))
    }
}

impl From<mocksaml_crypto::CryptoError> for SamlError {
    fn from(err: mocksaml_crypto::CryptoError) -> Self {
        Self::Signing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            SamlError::Transport(String::new()),
            SamlError::MalformedRequest(String::new()),
            SamlError::Replay(String::new()),
            SamlError::DuplicateRequest(String::new()),
            SamlError::UnknownSession(String::new()),
            SamlError::InvalidState(String::new()),
            SamlError::Signing(String::new()),
            SamlError::SignatureInvalid(String::new()),
            SamlError::Internal(String::new()),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn protocol_errors_map_to_requester() {
        let err = SamlError::MalformedRequest("missing issuer".to_string());
        assert_eq!(err.status_code(), status_codes::REQUESTER);
        assert!(!err.is_transport());

        let err = SamlError::Replay("req-1".to_string());
        assert_eq!(err.status_code(), status_codes::REQUESTER);
    }

    #[test]
    fn transport_errors_are_hard() {
        let err = SamlError::Transport("bad base64".to_string());
        assert!(err.is_transport());
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn signing_errors_are_fatal() {
        assert!(SamlError::Signing("bad key".to_string()).is_fatal());
        assert!(!SamlError::SignatureInvalid("mismatch".to_string()).is_fatal());
    }
}
