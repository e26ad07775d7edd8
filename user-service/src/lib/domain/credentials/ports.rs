use async_trait::async_trait;

use crate::domain::credentials::errors::CredentialsError;
use crate::domain::credentials::errors::TokenStoreError;
use crate::domain::credentials::models::RefreshToken;
use crate::domain::credentials::models::RefreshTokenRecord;
use crate::domain::credentials::models::RevokeOutcome;
use crate::domain::credentials::models::TokenPair;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::UserId;

/// Port for the session and password flows.
#[async_trait]
pub trait CredentialsServicePort: Send + Sync + 'static {
    /// Exchange email and password for a token pair.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, inactive account or wrong password
    async fn login(&self, email: &EmailAddress, password: &str)
        -> Result<TokenPair, CredentialsError>;

    /// Rotate a refresh token into a new token pair.
    ///
    /// The presented token is revoked. Presenting an already revoked token
    /// revokes every session of its owner.
    ///
    /// # Errors
    /// * `InvalidToken` - Token invalid, expired, unknown, or owner inactive
    /// * `TokenReused` - Token had already been rotated or revoked
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, CredentialsError>;

    /// Revoke every refresh token of `user_id`.
    async fn logout(&self, user_id: &UserId) -> Result<(), CredentialsError>;

    /// Publish a password reset notification for an active account.
    ///
    /// Unknown or inactive addresses are accepted silently.
    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), CredentialsError>;

    /// Set a new password using a password reset token and end all sessions.
    ///
    /// # Errors
    /// * `InvalidToken` - Token invalid, expired, of another kind, or owner inactive
    async fn reset_password(
        &self,
        token: &str,
        new_password: Password,
    ) -> Result<(), CredentialsError>;
}

/// Refresh token persistence.
///
/// Each operation is atomic with respect to the others.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Insert or update a record.
    ///
    /// `created_at` is set on first insert only. `updated_at` is set on every
    /// write. A revoked record stays revoked.
    async fn set_token(&self, token: RefreshToken) -> Result<(), TokenStoreError>;

    async fn get_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, TokenStoreError>;

    /// False for tokens the store has never seen.
    async fn is_token_revoked(&self, token: &str) -> Result<bool, TokenStoreError>;

    /// Revoke every record of `user_id`, returning how many changed.
    async fn set_token_revoked(&self, user_id: &UserId) -> Result<usize, TokenStoreError>;

    /// Revoke a single record, reporting what it found.
    async fn revoke_token(&self, token: &str) -> Result<RevokeOutcome, TokenStoreError>;

    /// Revoke `old` and record `new` in one step.
    ///
    /// `new` is written only when the outcome is `Revoked`, so a concurrent
    /// `set_token_revoked` either stops the rotation or revokes `new` too.
    async fn rotate_token(
        &self,
        old: &str,
        new: RefreshToken,
    ) -> Result<RevokeOutcome, TokenStoreError>;
}
