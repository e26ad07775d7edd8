use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::OnceLock;

/// Identity established by a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    scopes: BTreeSet<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, scopes: BTreeSet<String>) -> Self {
        Self {
            subject: subject.into(),
            scopes,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

/// Per-request state shared between the authentication layer and handlers.
///
/// Cloning is cheap and every clone observes the same slot. The principal
/// can be written once; later writes are rejected.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Arc<OnceLock<Principal>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the authenticated principal.
    ///
    /// # Errors
    /// Returns the rejected principal when one is already attached.
    pub fn set_principal(&self, principal: Principal) -> Result<(), Principal> {
        self.principal.set(principal)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.get()
    }
}
