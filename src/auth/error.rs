use thiserror::Error;

/// Authentication failures reported by a [`super::TokenValidator`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Session token is not recognized")]
    InvalidToken,
    #[error("Session token has expired")]
    TokenExpired,
    #[error("Token validator unavailable: {0}")]
    ValidatorUnavailable(String),
}
