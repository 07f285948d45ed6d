//! Identity provider seam.
//!
//! Sign-in and sign-out happen elsewhere; the core only asks who the current user is.

use abg_types::Identity;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in or guest identity, or `None` when nobody is signed in.
    async fn current_identity(&self) -> Option<Identity>;
}

/// Provider that always reports the same identity. Used by the CLI and per-request in the
/// REST API, where the identity arrives with the request.
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity(pub Option<Identity>);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}
