//! Mock SAML 2.0 Identity Provider for integration tests.
//!
//! This crate implements the IdP half of SP-initiated SSO so that
//! Service Provider code can be tested end to end without a real
//! identity provider:
//!
//! - **AuthnRequest parsing and validation** - Handle incoming authentication requests
//! - **SAML Response/Assertion generation** - Create signed SAML responses
//! - **XML signature** - Sign and validate XML documents using XML-DSig
//! - **POST and Redirect bindings** - Support for both SAML binding types
//! - **Session tracking** - Replay detection and expiry under simulated time
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`types`] - Core SAML types and data structures
//! - [`signature`] - XML signature signing and validation
//! - [`bindings`] - POST and Redirect binding implementations
//! - [`session`] - Login session lifecycle tracking
//! - [`engine`] - The request-to-response flow driver
//! - [`endpoints`] - Axum HTTP handlers for the IdP endpoints
//! - [`config`] - IdP identity, key material, and lifetimes
//! - [`error`] - Error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use mocksaml_idp::endpoints::{idp_router, IdpState};
//! use mocksaml_idp::engine::FlowEngine;
//!
//! let engine = FlowEngine::new(config)?;
//! let app = idp_router().with_state(IdpState::new(engine));
//! ```
//!
//! # SAML Specifications
//!
//! This implementation follows these specifications:
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod endpoints;
pub mod engine;
pub mod error;
pub mod session;
pub mod signature;
pub mod types;

pub use config::{IdpConfig, MockUserProfile};
pub use engine::{FlowEngine, SsoResponse};
pub use error::{SamlError, SamlResult};
pub use types::*;
