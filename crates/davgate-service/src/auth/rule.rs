//! Path access rules.

use davgate_core::config::RuleConfig;
use regex::Regex;

use crate::error::{ServiceError, ServiceResult};

/// How a rule matches a request path.
#[derive(Debug, Clone)]
pub enum RulePattern {
    /// Matches when the path starts with this prefix, byte-wise.
    Prefix(String),
    /// Matches when the expression matches anywhere in the path.
    Regex(Regex),
}

/// A single allow/deny rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct AccessRule {
    pattern: RulePattern,
    allow: bool,
}

impl AccessRule {
    #[must_use]
    pub fn prefix(prefix: impl Into<String>, allow: bool) -> Self {
        Self {
            pattern: RulePattern::Prefix(prefix.into()),
            allow,
        }
    }

    /// ## Summary
    /// Compiles a regular-expression rule.
    ///
    /// ## Errors
    /// Returns `InvalidRulePattern` if the expression does not compile.
    pub fn regex(pattern: &str, allow: bool) -> ServiceResult<Self> {
        let compiled = Regex::new(pattern).map_err(|source| ServiceError::InvalidRulePattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: RulePattern::Regex(compiled),
            allow,
        })
    }

    /// ## Summary
    /// Builds a rule from its configuration entry.
    ///
    /// ## Errors
    /// Returns `InvalidRulePattern` for a regex entry that does not compile.
    pub fn from_config(config: &RuleConfig) -> ServiceResult<Self> {
        if config.regex {
            Self::regex(&config.path, config.allow)
        } else {
            Ok(Self::prefix(config.path.clone(), config.allow))
        }
    }

    /// ## Summary
    /// Compiles a list of rule entries, keeping their order.
    ///
    /// ## Errors
    /// Returns the first compile failure.
    pub fn compile_all(configs: &[RuleConfig]) -> ServiceResult<Vec<Self>> {
        configs.iter().map(Self::from_config).collect()
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.pattern {
            RulePattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            RulePattern::Regex(regex) => regex.is_match(path),
        }
    }

    #[must_use]
    pub const fn allow(&self) -> bool {
        self.allow
    }

    #[must_use]
    pub const fn pattern(&self) -> &RulePattern {
        &self.pattern
    }
}

/// ## Summary
/// Evaluates `rules` in order against `path`. The first matching rule decides;
/// when none match, the path is allowed.
#[must_use]
pub fn path_allowed(rules: &[AccessRule], path: &str) -> bool {
    rules
        .iter()
        .find(|rule| rule.matches(path))
        .is_none_or(AccessRule::allow)
}
