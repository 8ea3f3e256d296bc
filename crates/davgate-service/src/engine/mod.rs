//! Protocol engine seam.
//!
//! The gate decides whether a request reaches an engine and as which principal;
//! everything about the wire protocol itself lives behind [`DavEngine`].

pub mod lock;
pub mod mux;

use std::sync::Arc;

use salvo::{Request, Response};

use crate::auth::Principal;
use crate::error::ServiceResult;

pub use lock::{ActiveLock, LockDepth, LockError, LockNamespace};
pub use mux::HandlerMultiplexer;

/// A protocol engine bound to one principal's root and lock namespace.
#[salvo::async_trait]
pub trait DavEngine: Send + Sync {
    /// Whether `path` (relative to the engine root) names a collection.
    async fn is_collection(&self, path: &str) -> bool;

    /// Serves the request. The response is passed to the client unmodified.
    async fn serve(&self, req: &mut Request, res: &mut Response);
}

/// Builds an engine for a principal on first use.
#[salvo::async_trait]
pub trait EngineFactory: Send + Sync {
    /// ## Errors
    /// Returns an error if the engine cannot be bound to the principal's root.
    async fn build(
        &self,
        principal: &Principal,
        locks: Arc<LockNamespace>,
    ) -> ServiceResult<Arc<dyn DavEngine>>;
}

/// Cached engine plus the lock namespace it was built with.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn DavEngine>,
    locks: Arc<LockNamespace>,
}

impl EngineHandle {
    #[must_use]
    pub fn new(engine: Arc<dyn DavEngine>, locks: Arc<LockNamespace>) -> Self {
        Self { engine, locks }
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<dyn DavEngine> {
        &self.engine
    }

    #[must_use]
    pub fn locks(&self) -> &Arc<LockNamespace> {
        &self.locks
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("root", &self.locks.root())
            .finish_non_exhaustive()
    }
}
