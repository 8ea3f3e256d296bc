//! Principals and the registry that owns them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use davgate_core::config::{AnonymousConfig, SecretValue, Settings};

use super::rule::{AccessRule, path_allowed};
use crate::error::{ServiceError, ServiceResult};

/// Stable identity of a principal, used as the engine cache key.
///
/// The anonymous principal has its own variant so that a configured user
/// named "anonymous" never shares an engine with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrincipalKey {
    User(String),
    Anonymous,
}

impl std::fmt::Display for PrincipalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(name) => write!(f, "user:{name}"),
            Self::Anonymous => f.write_str("anonymous"),
        }
    }
}

/// A configured identity: its secret, filesystem root, modify flag and rules.
#[derive(Debug)]
pub struct Principal {
    key: PrincipalKey,
    secret: SecretValue,
    root: PathBuf,
    can_modify: bool,
    rules: Vec<AccessRule>,
}

impl Principal {
    #[must_use]
    pub fn user(
        username: impl Into<String>,
        secret: SecretValue,
        root: impl Into<PathBuf>,
        can_modify: bool,
        rules: Vec<AccessRule>,
    ) -> Self {
        Self {
            key: PrincipalKey::User(username.into()),
            secret,
            root: root.into(),
            can_modify,
            rules,
        }
    }

    #[must_use]
    pub fn anonymous(root: impl Into<PathBuf>, can_modify: bool, rules: Vec<AccessRule>) -> Self {
        Self {
            key: PrincipalKey::Anonymous,
            secret: SecretValue::default(),
            root: root.into(),
            can_modify,
            rules,
        }
    }

    /// ## Summary
    /// Builds the anonymous principal from its configuration section.
    ///
    /// ## Errors
    /// Returns `InvalidRulePattern` if a rule does not compile.
    pub fn anonymous_from_config(config: &AnonymousConfig) -> ServiceResult<Self> {
        Ok(Self::anonymous(
            config.root.clone(),
            config.modify,
            AccessRule::compile_all(&config.rules)?,
        ))
    }

    #[must_use]
    pub const fn key(&self) -> &PrincipalKey {
        &self.key
    }

    /// The username, or `"anonymous"` for the anonymous principal.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.key {
            PrincipalKey::User(name) => name,
            PrincipalKey::Anonymous => "anonymous",
        }
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self.key, PrincipalKey::Anonymous)
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn can_modify(&self) -> bool {
        self.can_modify
    }

    #[must_use]
    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Path-level verdict from the rule list alone.
    #[must_use]
    pub fn allows_path(&self, path: &str) -> bool {
        path_allowed(&self.rules, path)
    }
}

/// Username to principal mapping. Read-only after startup.
#[derive(Debug, Default)]
pub struct PrincipalRegistry {
    principals: HashMap<String, Arc<Principal>>,
}

impl PrincipalRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Adds a principal under its username.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` for a duplicate username or an anonymous principal.
    pub fn insert(&mut self, principal: Principal) -> ServiceResult<()> {
        let PrincipalKey::User(username) = principal.key() else {
            return Err(ServiceError::InvalidConfiguration(
                "the anonymous principal cannot be registered as a user".to_string(),
            ));
        };

        if username.is_empty() {
            return Err(ServiceError::InvalidConfiguration(
                "user needs a username".to_string(),
            ));
        }

        if self.principals.contains_key(username) {
            return Err(ServiceError::InvalidConfiguration(format!(
                "duplicate user {username:?}"
            )));
        }

        let username = username.clone();
        self.principals.insert(username, Arc::new(principal));
        Ok(())
    }

    /// ## Summary
    /// Builds the registry from loaded settings. Users inherit `root`, `modify` and
    /// `rules` from the `defaults` section when they leave them out.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` for duplicate or empty usernames and
    /// `InvalidRulePattern` for rules that do not compile.
    pub fn from_settings(settings: &Settings) -> ServiceResult<Self> {
        let default_rules = AccessRule::compile_all(&settings.defaults.rules)?;
        let mut registry = Self::new();

        for user in &settings.users {
            let rules = match &user.rules {
                Some(rules) => AccessRule::compile_all(rules)?,
                None => default_rules.clone(),
            };

            registry.insert(Principal::user(
                user.username.clone(),
                user.password.clone(),
                user.root
                    .clone()
                    .unwrap_or_else(|| settings.defaults.root.clone()),
                user.modify.unwrap_or(settings.defaults.modify),
                rules,
            ))?;
        }

        Ok(registry)
    }

    #[must_use]
    pub fn get(&self, username: &str) -> Option<&Arc<Principal>> {
        self.principals.get(username)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Principal>> {
        self.principals.values()
    }
}
