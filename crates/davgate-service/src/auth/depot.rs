//! Depot helpers for passing the resolved identity between Salvo handlers.

use std::sync::Arc;

use super::principal::Principal;

pub mod depot_keys {
    pub const EFFECTIVE_PRINCIPAL: &str = "__effective_principal";
}

/// Identity stored in the depot once authentication has run.
#[derive(Debug, Clone)]
pub enum DepotPrincipal {
    Principal(Arc<Principal>),
    /// Authenticated as nobody: auth is disabled and no anonymous principal exists.
    Nobody,
}

impl From<Option<Arc<Principal>>> for DepotPrincipal {
    fn from(principal: Option<Arc<Principal>>) -> Self {
        principal.map_or(Self::Nobody, Self::Principal)
    }
}

/// Store the effective principal for downstream handlers.
pub fn insert_principal_into_depot(depot: &mut salvo::Depot, principal: Option<Arc<Principal>>) {
    depot.insert(
        depot_keys::EFFECTIVE_PRINCIPAL,
        DepotPrincipal::from(principal),
    );
}

/// Get the effective principal from the depot.
///
/// Returns `None` when authentication resolved no identity or has not run.
#[must_use]
pub fn get_principal_from_depot(depot: &salvo::Depot) -> Option<Arc<Principal>> {
    match depot.get::<DepotPrincipal>(depot_keys::EFFECTIVE_PRINCIPAL) {
        Ok(DepotPrincipal::Principal(principal)) => Some(Arc::clone(principal)),
        Ok(DepotPrincipal::Nobody) => None,
        Err(_missing) => {
            tracing::warn!("Depot missing principal context; treating request as unauthenticated");
            None
        }
    }
}
