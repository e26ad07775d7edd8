use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Name of the custom claim holding access-token scopes.
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// Discriminator stored in the `type` claim of every token.
///
/// Validation paths require a specific kind so a token minted for one
/// purpose cannot be replayed against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
    AccountVerify,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::PasswordReset => "password-reset",
            TokenKind::AccountVerify => "account-verify",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every token the signer mints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Subject (principal identifier)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Unique token identifier, keeps two tokens minted in the same second distinct
    pub jti: String,

    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Scopes, only present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl Claims {
    /// Scope set of the token; empty when the claim is absent.
    pub fn scopes(&self) -> BTreeSet<String> {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// A token is expired from its `exp` instant onwards.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }
}
