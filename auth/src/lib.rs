//! Authentication utilities library
//!
//! Provides the credential pipeline shared by the blog services:
//! - ES256 token signing (issuing service only) and verification (every service)
//! - Bearer authentication with scope enforcement
//! - Typed per-request context carrying the authenticated principal
//! - Password hashing (Argon2id)
//! - Clock abstraction so token expiry and record timestamps are testable
//!
//! # Examples
//!
//! ## Issuing and validating tokens
//! ```
//! use auth::{JwtSigner, JwtVerifier, TokenSettings, TokenSigner, TokenVerifier};
//!
//! fn issue(private_pem: &[u8], public_pem: &[u8]) -> Result<(), auth::JwtError> {
//!     let settings = TokenSettings::new("blog", "blog-api");
//!     let signer = JwtSigner::new(private_pem, settings)?;
//!     let verifier = JwtVerifier::new(public_pem, "blog", "blog-api")?;
//!
//!     let issued = signer.create_access_token("user-1", &["posts:write".to_string()])?;
//!     let claims = verifier.validate_token(&issued.token)?;
//!     assert_eq!(claims.sub, "user-1");
//!     Ok(())
//! }
//! ```
//!
//! ## Authenticating a request
//! ```
//! use auth::{AuthenticationInput, Authenticator, JwtVerifier, RequestContext, BEARER_AUTH};
//!
//! fn guard(authenticator: &Authenticator<JwtVerifier>, header: Option<&str>) -> bool {
//!     let context = RequestContext::new();
//!     let input = AuthenticationInput {
//!         security_scheme: BEARER_AUTH,
//!         authorization: header,
//!         scopes: &["all-users:read"],
//!     };
//!     authenticator.authenticate(&input, &context).is_ok()
//! }
//! ```

pub mod authenticator;
pub mod clock;
pub mod context;
pub mod jwt;
pub mod key_source;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::AuthenticationInput;
pub use authenticator::Authenticator;
pub use authenticator::BEARER_AUTH;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use context::Principal;
pub use context::RequestContext;
pub use jwt::Claims;
pub use jwt::IssuedToken;
pub use jwt::JwtError;
pub use jwt::JwtSigner;
pub use jwt::JwtVerifier;
pub use jwt::TokenKind;
pub use jwt::TokenSettings;
pub use jwt::TokenSigner;
pub use jwt::TokenVerifier;
pub use key_source::KeySource;
pub use key_source::KeySourceError;
pub use password::PasswordError;
pub use password::PasswordHasher;
