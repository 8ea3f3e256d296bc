use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::password::SecretVerifier;
use super::principal::{Principal, PrincipalRegistry};

/// Username and password taken from a Basic `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// ## Summary
    /// Parses an `Authorization` header value of the form `Basic <base64(user:pass)>`.
    ///
    /// Returns `None` for other schemes and for values that do not decode to
    /// UTF-8 text containing a `:`.
    #[must_use]
    pub fn from_authorization(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (username, password) = text.split_once(':')?;

        Some(Self::new(username, password))
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Result of authenticating one request.
///
/// A principal may be present while `authorized` is false: a known user with
/// a wrong secret is still resolved so it can be logged.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub principal: Option<Arc<Principal>>,
    pub authorized: bool,
}

impl AuthOutcome {
    #[must_use]
    pub const fn rejected(principal: Option<Arc<Principal>>) -> Self {
        Self {
            principal,
            authorized: false,
        }
    }

    #[must_use]
    pub const fn accepted(principal: Option<Arc<Principal>>) -> Self {
        Self {
            principal,
            authorized: true,
        }
    }
}

/// Verifies credentials against the principal registry.
#[derive(Debug)]
pub struct Authenticator {
    enabled: bool,
    registry: PrincipalRegistry,
    verifier: SecretVerifier,
}

impl Authenticator {
    #[must_use]
    pub fn new(enabled: bool, registry: PrincipalRegistry) -> Self {
        Self {
            enabled,
            registry,
            verifier: SecretVerifier::new(),
        }
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn registry(&self) -> &PrincipalRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn verifier(&self) -> &SecretVerifier {
        &self.verifier
    }

    /// ## Summary
    /// Resolves the principal behind `credentials` and decides whether the request
    /// may proceed.
    ///
    /// With authentication disabled the lookup is advisory: a known username is
    /// returned without checking its secret and every request is authorized.
    /// With authentication enabled, missing credentials, unknown users and wrong
    /// secrets are all rejected.
    #[must_use]
    pub fn authenticate(&self, credentials: Option<&Credentials>) -> AuthOutcome {
        if !self.enabled {
            let principal = credentials.and_then(|c| self.registry.get(c.username()).cloned());
            tracing::trace!(
                resolved = principal.is_some(),
                "Authentication disabled; identity is advisory"
            );
            return AuthOutcome::accepted(principal);
        }

        let Some(credentials) = credentials else {
            tracing::debug!("Request carried no credentials");
            return AuthOutcome::rejected(None);
        };

        let Some(principal) = self.registry.get(credentials.username()) else {
            tracing::warn!(username = %credentials.username(), "Unknown user");
            return AuthOutcome::rejected(None);
        };

        if self
            .verifier
            .verify(principal.secret(), credentials.password())
        {
            tracing::debug!(username = %credentials.username(), "User authenticated");
            AuthOutcome::accepted(Some(Arc::clone(principal)))
        } else {
            tracing::warn!(username = %credentials.username(), "Wrong password");
            AuthOutcome::rejected(Some(Arc::clone(principal)))
        }
    }
}
