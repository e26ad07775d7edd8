use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::user::models::UserId;

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token
    pub expires_in: Duration,
}

/// Refresh token as written by the issuing flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub user_id: UserId,
    pub token: String,
    pub ttl: Duration,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn new(user_id: UserId, token: String, ttl: Duration) -> Self {
        Self {
            user_id,
            token,
            ttl,
            revoked: false,
        }
    }
}

/// Stored refresh token.
///
/// `revoked` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub user_id: UserId,
    pub token: String,
    pub ttl: Duration,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.ttl
    }
}

/// Result of atomically revoking a single refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// This call revoked the token
    Revoked,
    /// The token had been revoked before; it is being replayed
    AlreadyRevoked,
    /// The store has never seen the token
    Unknown,
}
