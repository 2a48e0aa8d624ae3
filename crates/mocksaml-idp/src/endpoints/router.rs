//! SAML router configuration.
//!
//! Provides the axum router for the mock IdP endpoints.

use axum::{routing::get, Router};

use super::metadata::idp_metadata;
use super::sso::{sso_post, sso_redirect};
use super::IdpState;

/// Creates the mock IdP router.
///
/// # Endpoints
///
/// | Method   | Path        | Handler        | Description            |
/// |----------|-------------|----------------|------------------------|
/// | GET      | `/metadata` | `idp_metadata` | IdP metadata           |
/// | GET/POST | `/sso`      | `sso`          | Single Sign-On service |
///
/// # Usage
///
/// ```rust,ignore
/// use mocksaml_idp::endpoints::{idp_router, IdpState};
///
/// let state = IdpState::new(engine);
/// let app = idp_router().with_state(state);
/// ```
pub fn idp_router() -> Router<IdpState> {
    Router::new()
        .route("/metadata", get(idp_metadata))
        .route("/sso", get(sso_redirect).post(sso_post))
}
