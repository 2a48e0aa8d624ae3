//! SAML Status types.

use serde::{Deserialize, Serialize};

use super::status_codes;

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The top-level status code URI.
    pub status_code: String,

    /// Optional human-readable status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status_code: status_codes::SUCCESS.to_string(),
            status_message: None,
        }
    }

    /// Creates a requester error status.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self {
            status_code: status_codes::REQUESTER.to_string(),
            status_message: Some(message.into()),
        }
    }

    /// Creates a responder error status.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self {
            status_code: status_codes::RESPONDER.to_string(),
            status_message: Some(message.into()),
        }
    }

    /// Creates a status from a code URI and optional message.
    #[must_use]
    pub fn from_code(code: impl Into<String>, message: Option<String>) -> Self {
        Self {
            status_code: code.into(),
            status_message: message,
        }
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == status_codes::SUCCESS
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_success() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.status_message.is_none());
    }

    #[test]
    fn status_requester_error() {
        let status = Status::requester_error("missing Issuer");
        assert!(!status.is_success());
        assert_eq!(status.status_code, status_codes::REQUESTER);
        assert_eq!(status.status_message.as_deref(), Some("missing Issuer"));
    }

    #[test]
    fn status_responder_error() {
        let status = Status::responder_error("signing failed");
        assert_eq!(status.status_code, status_codes::RESPONDER);
    }
}
