use thiserror::Error;

use crate::auth::AuthError;

/// Error kinds surfaced by engine operations.
///
/// Conflict-style outcomes (already started, property cap reached, member
/// not present) are reported as `Ok(false)` by the boolean operations, not
/// as errors. Errors never partially mutate state.
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error("Operation requires lobby ownership")]
    Forbidden,
    #[error("Lobby not found")]
    NotFound,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LobbyError {
    /// Stable machine-readable code for API responses and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Internal(_) => "internal",
        }
    }
}
