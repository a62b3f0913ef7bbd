use serde::{Deserialize, Serialize};

/// A pre-provisioned session for the in-memory token validator.
///
/// Deployments that front a real session service leave this list empty and
/// install their own [`crate::auth::TokenValidator`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntry {
    /// Opaque bearer token presented by clients.
    pub token: String,
    /// Stable user identity the token resolves to.
    pub user_id: String,
    /// Display name shown to other lobby members.
    pub display_name: String,
}
