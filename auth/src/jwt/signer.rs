use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use uuid::Uuid;

use super::claims::Claims;
use super::claims::TokenKind;
use super::errors::JwtError;
use crate::clock::Clock;
use crate::clock::SystemClock;

/// Lifetime of password-reset tokens.
pub const PASSWORD_RESET_TTL_MINUTES: i64 = 15;

/// Lifetime of account-verification tokens.
pub const VERIFY_ACCOUNT_TTL_HOURS: i64 = 24;

/// A freshly minted token and how long it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: Duration,
}

/// Issuer-side settings shared by every token kind.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl TokenSettings {
    /// Settings with a 15 minute access TTL and a 7 day refresh TTL.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
        }
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }
}

/// Token minting, implemented by the issuing service.
pub trait TokenSigner: Send + Sync + 'static {
    /// Mint an access token carrying `scopes` in the permissions claim.
    ///
    /// # Errors
    /// * `EncodingFailed` - Claims could not be serialized or signed
    fn create_access_token(&self, subject: &str, scopes: &[String])
        -> Result<IssuedToken, JwtError>;

    /// Mint a refresh token (no scopes, longer TTL).
    fn create_refresh_token(&self, subject: &str) -> Result<IssuedToken, JwtError>;

    /// Mint a short-lived password-reset token.
    fn create_password_reset_token(&self, subject: &str) -> Result<IssuedToken, JwtError>;

    /// Mint an account-verification token.
    fn create_verify_account_token(&self, subject: &str) -> Result<IssuedToken, JwtError>;
}

/// ES256 token signer.
///
/// Holds the private key; only the issuing service constructs one.
pub struct JwtSigner {
    encoding_key: EncodingKey,
    settings: TokenSettings,
    clock: Arc<dyn Clock>,
}

impl JwtSigner {
    /// Create a signer from a PKCS#8 PEM encoded P-256 private key.
    ///
    /// Key material is generated with:
    /// ```text
    /// openssl ecparam -name prime256v1 -genkey -noout -out ec.pem
    /// openssl pkcs8 -topk8 -nocrypt -in ec.pem -out ec_private.pem
    /// ```
    ///
    /// # Errors
    /// * `InvalidKey` - PEM is malformed or not an EC private key
    pub fn new(private_key_pem: &[u8], settings: TokenSettings) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_ec_pem(private_key_pem)
            .map_err(|e| JwtError::InvalidKey(e.to_string()))?;

        Ok(Self {
            encoding_key,
            settings,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to stamp `iat` and `exp`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    fn sign(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
        permissions: Option<Vec<String>>,
    ) -> Result<IssuedToken, JwtError> {
        let now = self.clock.now();

        let claims = Claims {
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind,
            permissions,
        };

        let token = encode(&Header::new(Algorithm::ES256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: ttl,
        })
    }
}

impl TokenSigner for JwtSigner {
    fn create_access_token(
        &self,
        subject: &str,
        scopes: &[String],
    ) -> Result<IssuedToken, JwtError> {
        self.sign(
            subject,
            TokenKind::Access,
            self.settings.access_token_ttl,
            Some(scopes.to_vec()),
        )
    }

    fn create_refresh_token(&self, subject: &str) -> Result<IssuedToken, JwtError> {
        self.sign(
            subject,
            TokenKind::Refresh,
            self.settings.refresh_token_ttl,
            None,
        )
    }

    fn create_password_reset_token(&self, subject: &str) -> Result<IssuedToken, JwtError> {
        self.sign(
            subject,
            TokenKind::PasswordReset,
            Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
            None,
        )
    }

    fn create_verify_account_token(&self, subject: &str) -> Result<IssuedToken, JwtError> {
        self.sign(
            subject,
            TokenKind::AccountVerify,
            Duration::hours(VERIFY_ACCOUNT_TTL_HOURS),
            None,
        )
    }
}
