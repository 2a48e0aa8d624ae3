//! SAML binding codecs.
//!
//! Transport encodings for SAML messages:
//!
//! - **HTTP-Redirect** - DEFLATE (raw, no zlib header), base64, URL-encode,
//!   carried in query parameters
//! - **HTTP-POST** - base64, carried in an auto-submitting HTML form
//!
//! Failures at this layer are transport errors: there is no well-formed
//! SAML message to answer, so the caller gets a hard error rather than a
//! SAML error response.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

/// Default cap on the decoded size of an inbound message.
///
/// DEFLATE expands under attacker control, so decoding stops once the
/// output exceeds this many bytes.
pub const DEFAULT_MAX_DECODED_LEN: usize = 1 << 20;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the query/form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// A SAML message decoded from its transport encoding.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML document.
    pub xml: String,
    /// Whether the message is a request or a response.
    pub message_type: SamlMessageType,
    /// The RelayState, passed through untouched.
    pub relay_state: Option<String>,
    /// Detached signature (redirect binding only).
    pub signature: Option<String>,
    /// Detached signature algorithm URI (redirect binding only).
    pub sig_alg: Option<String>,
}
