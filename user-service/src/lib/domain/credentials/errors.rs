use thiserror::Error;

use crate::user::errors::EventPublisherError;
use crate::user::errors::UserError;

#[derive(Debug, Clone, Error)]
pub enum TokenStoreError {
    #[error("Token store unavailable: {0}")]
    Unavailable(String),
}

/// Errors of the login, refresh and password reset flows
#[derive(Debug, Clone, Error)]
pub enum CredentialsError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("Refresh token reuse detected")]
    TokenReused,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    #[error("Event publishing failed: {0}")]
    EventPublishing(#[from] EventPublisherError),
}
