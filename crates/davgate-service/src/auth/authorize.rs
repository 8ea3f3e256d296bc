//! Per-request authorization: path rules first, then the modify gate.

use super::action::{Action, action_for_method};
use super::principal::Principal;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity could be resolved for the request.
    NoPrincipal,
    /// The first matching rule denies the path.
    PathRule,
    /// Modify-class method from a principal without modify permission.
    ReadOnly,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NoPrincipal => "no principal",
            Self::PathRule => "path rule",
            Self::ReadOnly => "read-only principal",
        })
    }
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzResult {
    /// Access is allowed.
    Allowed,
    /// Access is denied.
    Denied(DenyReason),
}

impl AuthzResult {
    /// Returns `true` if access is allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// ## Summary
/// Decides whether `principal` may perform `method` on `path`.
///
/// A missing principal is refused outright. Otherwise the principal's rules are
/// evaluated first-match-wins (default allow); an allowed path is still refused
/// for a modify-class method when the principal cannot modify.
#[must_use]
pub fn authorize(principal: Option<&Principal>, path: &str, method: &str) -> AuthzResult {
    let Some(principal) = principal else {
        return AuthzResult::Denied(DenyReason::NoPrincipal);
    };

    if !principal.allows_path(path) {
        return AuthzResult::Denied(DenyReason::PathRule);
    }

    if action_for_method(method) == Action::Modify && !principal.can_modify() {
        return AuthzResult::Denied(DenyReason::ReadOnly);
    }

    AuthzResult::Allowed
}
