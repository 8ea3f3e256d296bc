//! The materialized gate configuration and the shared request gate.

use std::sync::Arc;

use davgate_core::config::Settings;

use crate::auth::{AuthOutcome, Authenticator, Credentials, Principal, PrincipalRegistry};
use crate::cors::CorsPolicy;
use crate::engine::{EngineFactory, EngineHandle, HandlerMultiplexer};
use crate::error::ServiceResult;

/// Fully typed, validated input to the gate. Built once at startup.
#[derive(Debug)]
pub struct GateConfig {
    pub auth_enabled: bool,
    pub realm: String,
    pub cors: CorsPolicy,
    pub registry: PrincipalRegistry,
    pub anonymous: Option<Arc<Principal>>,
}

impl GateConfig {
    /// ## Summary
    /// Materializes loaded settings: compiles every rule, registers users with
    /// inherited defaults and derives the CORS policy.
    ///
    /// ## Errors
    /// Returns an error for rules that do not compile and for duplicate or
    /// empty usernames.
    pub fn from_settings(settings: &Settings) -> ServiceResult<Self> {
        let registry = PrincipalRegistry::from_settings(settings)?;
        let anonymous = settings
            .anonymous
            .as_ref()
            .map(Principal::anonymous_from_config)
            .transpose()?
            .map(Arc::new);

        if !settings.auth.enabled && !registry.is_empty() {
            tracing::info!(
                users = registry.len(),
                "Authentication disabled; configured users are advisory and credentials are not required"
            );
        }

        Ok(Self {
            auth_enabled: settings.auth.enabled,
            realm: settings.auth.realm.clone(),
            cors: CorsPolicy::from_config(&settings.cors),
            registry,
            anonymous,
        })
    }
}

/// Shared per-process state consulted by every request.
#[derive(Debug)]
pub struct Gate {
    realm: String,
    cors: CorsPolicy,
    authenticator: Authenticator,
    anonymous: Option<Arc<Principal>>,
    multiplexer: HandlerMultiplexer,
}

impl Gate {
    #[must_use]
    pub fn new(config: GateConfig, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            realm: config.realm,
            cors: config.cors,
            authenticator: Authenticator::new(config.auth_enabled, config.registry),
            anonymous: config.anonymous,
            multiplexer: HandlerMultiplexer::new(factory),
        }
    }

    #[must_use]
    pub const fn auth_enabled(&self) -> bool {
        self.authenticator.enabled()
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Value of the `WWW-Authenticate` challenge header.
    #[must_use]
    pub fn challenge(&self) -> String {
        format!("Basic realm=\"{}\"", self.realm)
    }

    #[must_use]
    pub const fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    #[must_use]
    pub const fn registry(&self) -> &PrincipalRegistry {
        self.authenticator.registry()
    }

    #[must_use]
    pub const fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    #[must_use]
    pub const fn anonymous(&self) -> Option<&Arc<Principal>> {
        self.anonymous.as_ref()
    }

    #[must_use]
    pub const fn multiplexer(&self) -> &HandlerMultiplexer {
        &self.multiplexer
    }

    #[must_use]
    pub fn authenticate(&self, credentials: Option<&Credentials>) -> AuthOutcome {
        self.authenticator.authenticate(credentials)
    }

    /// ## Summary
    /// Picks the identity an authorized request runs as: the authenticated
    /// principal if there is one, otherwise the configured anonymous principal.
    #[must_use]
    pub fn effective_principal(&self, outcome: &AuthOutcome) -> Option<Arc<Principal>> {
        outcome
            .principal
            .clone()
            .or_else(|| self.anonymous.clone())
    }

    /// ## Errors
    /// Returns the engine factory's error if the engine cannot be built.
    pub async fn handler_for(&self, principal: &Principal) -> ServiceResult<EngineHandle> {
        self.multiplexer.handler_for(principal).await
    }
}
