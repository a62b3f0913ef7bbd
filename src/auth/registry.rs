use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::SessionEntry;

use super::{AuthError, SessionIdentity, TokenValidator};

/// In-memory token validator backed by configured session entries.
///
/// Primarily for single-binary deployments and tests. Sessions can be
/// revoked at runtime, which the engine observes on the next mutating call.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionIdentity>,
}

impl SessionRegistry {
    pub fn new(entries: Vec<SessionEntry>) -> Self {
        let sessions = DashMap::new();
        for entry in entries {
            sessions.insert(
                entry.token,
                SessionIdentity {
                    user_id: entry.user_id,
                    display_name: entry.display_name,
                },
            );
        }
        Self { sessions }
    }

    /// Register a session at runtime. Later registrations for the same token
    /// replace the earlier identity.
    pub fn insert(&self, token: impl Into<String>, user_id: impl Into<String>, display_name: impl Into<String>) {
        self.sessions.insert(
            token.into(),
            SessionIdentity {
                user_id: user_id.into(),
                display_name: display_name.into(),
            },
        );
    }

    /// Drop a session; subsequent validations fail with `InvalidToken`.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl TokenValidator for SessionRegistry {
    async fn validate(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        self.sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validates_seeded_sessions() {
        let registry = SessionRegistry::new(vec![SessionEntry {
            token: "t1".to_string(),
            user_id: "u1".to_string(),
            display_name: "Player One".to_string(),
        }]);

        let identity = registry.validate("t1").await.expect("seeded token");
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.display_name, "Player One");
    }

    #[tokio::test]
    async fn rejects_unknown_and_revoked_tokens() {
        let registry = SessionRegistry::new(Vec::new());
        assert_eq!(
            registry.validate("nope").await.unwrap_err(),
            AuthError::InvalidToken
        );

        registry.insert("t2", "u2", "Player Two");
        assert!(registry.validate("t2").await.is_ok());
        assert!(registry.revoke("t2"));
        assert_eq!(
            registry.validate("t2").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }
}
