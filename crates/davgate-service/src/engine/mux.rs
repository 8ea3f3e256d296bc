use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::{EngineFactory, EngineHandle, LockNamespace};
use crate::auth::{Principal, PrincipalKey};
use crate::error::ServiceResult;

/// Per-principal engine cache.
///
/// Each key owns its own `OnceCell`, so construction is serialized per
/// principal while unrelated principals never wait on each other. A failed
/// construction leaves the cell empty and the next request retries.
pub struct HandlerMultiplexer {
    factory: Arc<dyn EngineFactory>,
    engines: DashMap<PrincipalKey, Arc<OnceCell<EngineHandle>>>,
}

impl HandlerMultiplexer {
    #[must_use]
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            engines: DashMap::new(),
        }
    }

    /// ## Summary
    /// Returns the engine for `principal`, building it with a fresh lock
    /// namespace on first use.
    ///
    /// ## Errors
    /// Returns the factory's error if construction fails.
    #[tracing::instrument(skip_all, fields(principal = %principal.key()))]
    pub async fn handler_for(&self, principal: &Principal) -> ServiceResult<EngineHandle> {
        let cell = self.cell_for(principal.key());

        let handle = cell
            .get_or_try_init(|| async {
                let locks = Arc::new(LockNamespace::new(principal.root()));
                let engine = self.factory.build(principal, Arc::clone(&locks)).await?;
                tracing::info!(root = %principal.root().display(), "Engine created");
                Ok::<_, crate::error::ServiceError>(EngineHandle::new(engine, locks))
            })
            .await?;

        Ok(handle.clone())
    }

    fn cell_for(&self, key: &PrincipalKey) -> Arc<OnceCell<EngineHandle>> {
        if let Some(cell) = self.engines.get(key) {
            return Arc::clone(cell.value());
        }
        Arc::clone(self.engines.entry(key.clone()).or_default().value())
    }

    /// Number of principals with an initialized engine.
    #[must_use]
    pub fn engine_count(&self) -> usize {
        self.engines
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }
}

impl std::fmt::Debug for HandlerMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerMultiplexer")
            .field("engines", &self.engine_count())
            .finish_non_exhaustive()
    }
}
