use crate::context::Principal;
use crate::context::RequestContext;
use crate::jwt::JwtError;
use crate::jwt::TokenVerifier;

/// The only security scheme the services declare.
pub const BEARER_AUTH: &str = "BearerAuth";

const BEARER_PREFIX: &str = "Bearer ";

/// What the router knows about the request being authenticated.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationInput<'a> {
    /// Security scheme declared by the route
    pub security_scheme: &'a str,
    /// Raw `Authorization` header value, if any
    pub authorization: Option<&'a str>,
    /// Scopes the route requires; all must be present on the token
    pub scopes: &'a [&'a str],
}

/// Authentication operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("security scheme {0} != 'BearerAuth'")]
    UnsupportedScheme(String),

    #[error("authorization header is missing")]
    NoAuthHeader,

    #[error("authorization header is malformed")]
    InvalidAuthHeader,

    #[error("validating token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("provided claims do not match expected scopes")]
    ClaimsInvalid,

    #[error("request already carries an authenticated principal")]
    PrincipalAlreadySet,
}

impl AuthenticationError {
    /// Failures caused by server wiring rather than by the caller's credentials.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            AuthenticationError::UnsupportedScheme(_) | AuthenticationError::PrincipalAlreadySet
        )
    }
}

/// Gate for protected operations: bearer token validation plus scope matching.
pub struct Authenticator<V> {
    verifier: V,
}

impl<V: TokenVerifier> Authenticator<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Authenticate a request and attach the principal to `context`.
    ///
    /// # Returns
    /// The principal that was attached
    ///
    /// # Errors
    /// * `UnsupportedScheme` - Route declares a scheme other than `BearerAuth`
    /// * `NoAuthHeader` / `InvalidAuthHeader` - Credential missing or malformed
    /// * `InvalidToken` - Token failed validation
    /// * `ClaimsInvalid` - A required scope is missing
    /// * `PrincipalAlreadySet` - Context was already authenticated
    pub fn authenticate(
        &self,
        input: &AuthenticationInput<'_>,
        context: &RequestContext,
    ) -> Result<Principal, AuthenticationError> {
        if input.security_scheme != BEARER_AUTH {
            return Err(AuthenticationError::UnsupportedScheme(
                input.security_scheme.to_string(),
            ));
        }

        let token = bearer_token(input.authorization)?;
        let claims = self.verifier.validate_token(token)?;

        let granted = claims.scopes();
        if !input.scopes.iter().all(|scope| granted.contains(*scope)) {
            tracing::debug!(
                subject = %claims.sub,
                required = ?input.scopes,
                granted = ?granted,
                "Token lacks required scopes"
            );
            return Err(AuthenticationError::ClaimsInvalid);
        }

        let principal = Principal::new(claims.sub, granted);
        context
            .set_principal(principal.clone())
            .map_err(|_| AuthenticationError::PrincipalAlreadySet)?;

        Ok(principal)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// Exactly one space separates the scheme from the token.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthenticationError> {
    let header = header.ok_or(AuthenticationError::NoAuthHeader)?;
    if header.is_empty() {
        return Err(AuthenticationError::NoAuthHeader);
    }

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthenticationError::InvalidAuthHeader)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthenticationError::InvalidAuthHeader);
    }

    Ok(token)
}
