//! Session token validation.
//!
//! The lobby service does not own identity: an opaque bearer token is
//! resolved to a user through a [`TokenValidator`]. The engine re-validates
//! the caller's token on every mutating operation. The crate ships an
//! in-memory [`SessionRegistry`] seeded from configuration; deployments
//! that front a real session service implement the trait themselves.

mod error;
mod registry;

pub use error::AuthError;
pub use registry::SessionRegistry;

use async_trait::async_trait;

/// Identity resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub display_name: String,
}

/// Maps an opaque session token to a user identity.
///
/// Implementations must be idempotent and side-effect free: the engine
/// calls `validate` on every mutating operation, and the hub relies on a
/// rejected token being rejected consistently.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<SessionIdentity, AuthError>;
}
