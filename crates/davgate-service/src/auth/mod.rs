//! Authentication and authorization flow.
//!
//! ## Module Organization
//!
//! - `action`: read/modify classification of request methods
//! - `authenticate`: Basic credential parsing and the `Authenticator`
//! - `authorize`: rule evaluation plus the modify gate
//! - `depot`: helpers for passing the resolved principal between Salvo handlers
//! - `password`: stored-secret schemes and the verified-pair memo
//! - `principal`: principals and the registry keyed by username
//! - `rule`: path access rules

pub mod action;
pub mod authenticate;
pub mod authorize;
pub mod depot;
pub mod password;
pub mod principal;
pub mod rule;

pub use action::{Action, action_for_method};
pub use authenticate::{AuthOutcome, Authenticator, Credentials};
pub use authorize::{AuthzResult, DenyReason, authorize};
pub use depot::{DepotPrincipal, get_principal_from_depot, insert_principal_into_depot};
pub use password::{SecretScheme, SecretVerifier};
pub use principal::{Principal, PrincipalKey, PrincipalRegistry};
pub use rule::{AccessRule, RulePattern};
