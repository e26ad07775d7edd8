use std::sync::Arc;

use jsonwebtoken::decode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::claims::TokenKind;
use super::errors::JwtError;
use crate::clock::Clock;
use crate::clock::SystemClock;

/// Token validation, implemented by every service that accepts tokens.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Validate signature, issuer, audience and expiry, and require `kind`.
    ///
    /// # Errors
    /// * `InvalidToken` - Malformed token, bad signature, wrong issuer or audience
    /// * `TokenExpired` - Token expiration is not after the current instant
    /// * `WrongKind` - Token is valid but minted for another purpose
    fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError>;

    /// Validate an access token.
    fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenKind::Access)
    }

    fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenKind::Refresh)
    }

    fn validate_password_reset_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenKind::PasswordReset)
    }

    fn validate_verify_account_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(token, TokenKind::AccountVerify)
    }
}

impl<T: TokenVerifier + ?Sized> TokenVerifier for Arc<T> {
    fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        (**self).validate(token, kind)
    }
}

/// ES256 token verifier.
///
/// Needs only the public key, so any service can validate tokens without
/// sharing a secret with the issuer.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtVerifier {
    /// Create a verifier from a PEM encoded P-256 public key.
    ///
    /// # Errors
    /// * `InvalidKey` - PEM is malformed or not an EC public key
    pub fn new(public_key_pem: &[u8], issuer: &str, audience: &str) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_ec_pem(public_key_pem)
            .map_err(|e| JwtError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Expiry is checked against the injected clock instead
        validation.validate_exp = false;

        Ok(Self {
            decoding_key,
            validation,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl TokenVerifier for JwtVerifier {
    fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.is_expired(self.clock.now().timestamp()) {
            return Err(JwtError::TokenExpired);
        }

        if claims.kind != kind {
            return Err(JwtError::WrongKind {
                expected: kind,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Duration;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::jwt::signer::JwtSigner;
    use crate::jwt::signer::TokenSettings;
    use crate::jwt::signer::TokenSigner;

    const PRIVATE_KEY: &[u8] = include_bytes!("../../fixtures/ec_private.pem");
    const PUBLIC_KEY: &[u8] = include_bytes!("../../fixtures/ec_public.pem");
    const OTHER_PRIVATE_KEY: &[u8] = include_bytes!("../../fixtures/ec_private_other.pem");
    const OTHER_PUBLIC_KEY: &[u8] = include_bytes!("../../fixtures/ec_public_other.pem");

    fn signer() -> JwtSigner {
        JwtSigner::new(PRIVATE_KEY, TokenSettings::new("blog", "blog-api"))
            .expect("Failed to load private key")
    }

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(PUBLIC_KEY, "blog", "blog-api").expect("Failed to load public key")
    }

    #[test]
    fn test_access_token_round_trip() {
        let scopes = vec!["all-users:read".to_string(), "all-users:write".to_string()];
        let issued = signer()
            .create_access_token("user123", &scopes)
            .expect("Failed to create token");

        let claims = verifier()
            .validate_token(&issued.token)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.iss, "blog");
        assert_eq!(claims.aud, "blog-api");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.scopes(), scopes.into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_access_token_without_scopes() {
        let issued = signer().create_access_token("user123", &[]).unwrap();
        let claims = verifier().validate_token(&issued.token).unwrap();
        assert!(claims.scopes().is_empty());
    }

    #[test]
    fn test_expired_at_simulated_time() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));

        let settings =
            TokenSettings::new("blog", "blog-api").with_access_token_ttl(Duration::minutes(5));
        let signer = JwtSigner::new(PRIVATE_KEY, settings)
            .unwrap()
            .with_clock(clock.clone());
        let verifier = verifier().with_clock(clock.clone());

        let issued = signer.create_access_token("user123", &[]).unwrap();

        clock.advance(Duration::minutes(5) - Duration::seconds(1));
        assert!(verifier.validate_token(&issued.token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(
            verifier.validate_token(&issued.token),
            Err(JwtError::TokenExpired)
        );

        clock.advance(Duration::days(1));
        assert_eq!(
            verifier.validate_token(&issued.token),
            Err(JwtError::TokenExpired)
        );
    }

    #[test]
    fn test_password_reset_rejects_access_token() {
        let issued = signer().create_access_token("user123", &[]).unwrap();

        let result = verifier().validate_password_reset_token(&issued.token);
        assert_eq!(
            result,
            Err(JwtError::WrongKind {
                expected: TokenKind::PasswordReset,
                actual: TokenKind::Access,
            })
        );
    }

    #[test]
    fn test_access_validation_rejects_password_reset_token() {
        let issued = signer().create_password_reset_token("user123").unwrap();

        assert!(matches!(
            verifier().validate_token(&issued.token),
            Err(JwtError::WrongKind { .. })
        ));

        let claims = verifier()
            .validate_password_reset_token(&issued.token)
            .expect("Reset token should validate on its own path");
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.kind, TokenKind::PasswordReset);
    }

    #[test]
    fn test_refresh_and_verify_kinds_are_confined() {
        let refresh = signer().create_refresh_token("user123").unwrap();
        let verify = signer().create_verify_account_token("user123").unwrap();

        assert!(verifier().validate_refresh_token(&refresh.token).is_ok());
        assert!(verifier().validate_token(&refresh.token).is_err());
        assert!(verifier().validate_verify_account_token(&refresh.token).is_err());

        assert!(verifier().validate_verify_account_token(&verify.token).is_ok());
        assert!(verifier().validate_password_reset_token(&verify.token).is_err());
        assert!(verifier().validate_refresh_token(&verify.token).is_err());
    }

    #[test]
    fn test_rejects_wrong_issuer_and_audience() {
        let issued = signer().create_access_token("user123", &[]).unwrap();

        let wrong_issuer = JwtVerifier::new(PUBLIC_KEY, "other", "blog-api").unwrap();
        assert!(matches!(
            wrong_issuer.validate_token(&issued.token),
            Err(JwtError::InvalidToken(_))
        ));

        let wrong_audience = JwtVerifier::new(PUBLIC_KEY, "blog", "other-api").unwrap();
        assert!(matches!(
            wrong_audience.validate_token(&issued.token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let foreign = JwtSigner::new(OTHER_PRIVATE_KEY, TokenSettings::new("blog", "blog-api"))
            .unwrap()
            .create_access_token("user123", &[])
            .unwrap();

        assert!(matches!(
            verifier().validate_token(&foreign.token),
            Err(JwtError::InvalidToken(_))
        ));

        let other_verifier = JwtVerifier::new(OTHER_PUBLIC_KEY, "blog", "blog-api").unwrap();
        assert!(other_verifier.validate_token(&foreign.token).is_ok());
    }

    #[test]
    fn test_rejects_malformed_token() {
        assert!(matches!(
            verifier().validate_token("invalid.token.here"),
            Err(JwtError::InvalidToken(_))
        ));
        assert!(verifier().validate_token("").is_err());
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let issued = signer().create_access_token("user123", &[]).unwrap();
        let admin = signer()
            .create_access_token("user123", &["all-users:write".to_string()])
            .unwrap();

        // Graft the privileged payload onto the unprivileged signature
        let parts: Vec<&str> = issued.token.split('.').collect();
        let admin_parts: Vec<&str> = admin.token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], admin_parts[1], parts[2]);

        assert!(matches!(
            verifier().validate_token(&forged),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_public_key() {
        assert!(matches!(
            JwtVerifier::new(b"-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----\n", "blog", "blog-api"),
            Err(JwtError::InvalidKey(_))
        ));
    }
}
