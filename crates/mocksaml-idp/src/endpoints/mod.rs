//! HTTP endpoints for the mock IdP.
//!
//! Thin axum handlers over the [`crate::engine::FlowEngine`]: the SSO
//! service over both bindings, and IdP metadata for SP configuration.

mod metadata;
mod router;
mod sso;

pub use metadata::*;
pub use router::*;
pub use sso::*;

use std::sync::Arc;

use crate::engine::FlowEngine;

/// Shared state for the SAML endpoints.
#[derive(Clone)]
pub struct IdpState {
    /// The flow engine, shared across handlers.
    pub engine: Arc<FlowEngine>,
}

impl IdpState {
    /// Wraps an engine for use as axum state.
    #[must_use]
    pub fn new(engine: FlowEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
