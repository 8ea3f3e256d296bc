//! A small `WebDAV` engine over the local filesystem.
//!
//! One [`LocalFsEngine`] is built per principal by [`LocalFsFactory`]; it is
//! confined to the principal's root and shares that principal's lock namespace.

pub mod lockinfo;
pub mod method;
pub mod xml;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use salvo::http::StatusCode;
use salvo::{Request, Response};

use davgate_service::auth::Principal;
use davgate_service::engine::{DavEngine, EngineFactory, LockNamespace};
use davgate_service::error::ServiceResult;

use crate::app::api::util::request_path;

pub const ALLOWED_METHODS: &str =
    "OPTIONS, GET, HEAD, PUT, DELETE, MKCOL, COPY, MOVE, PROPFIND, PROPPATCH, LOCK, UNLOCK";

/// Builds a [`LocalFsEngine`] per principal, creating the root if needed.
#[derive(Debug, Clone)]
pub struct LocalFsFactory {
    max_upload_bytes: u64,
}

impl LocalFsFactory {
    #[must_use]
    pub const fn new(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }
}

#[salvo::async_trait]
impl EngineFactory for LocalFsFactory {
    async fn build(
        &self,
        principal: &Principal,
        locks: Arc<LockNamespace>,
    ) -> ServiceResult<Arc<dyn DavEngine>> {
        tokio::fs::create_dir_all(principal.root()).await?;
        Ok(Arc::new(LocalFsEngine {
            root: principal.root().to_path_buf(),
            locks,
            max_upload_bytes: self.max_upload_bytes,
        }))
    }
}

#[derive(Debug)]
pub struct LocalFsEngine {
    root: PathBuf,
    locks: Arc<LockNamespace>,
    max_upload_bytes: u64,
}

impl LocalFsEngine {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn locks(&self) -> &LockNamespace {
        &self.locks
    }

    #[must_use]
    pub const fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// ## Summary
    /// Maps a decoded request path onto the filesystem below the root.
    ///
    /// Returns `None` for paths with `..` segments, which could leave the root.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }

    /// ## Summary
    /// Fails with 423 unless the request carries the token of every lock that
    /// protects `path`.
    ///
    /// ## Errors
    /// Returns `StatusCode::LOCKED` when a write to `path` is blocked.
    pub fn ensure_unlocked(&self, req: &Request, path: &str) -> Result<(), StatusCode> {
        let tokens = submitted_tokens(req);
        self.locks.check_write(path, &tokens).map_err(|e| {
            tracing::debug!(error = %e, "Write blocked by lock");
            StatusCode::LOCKED
        })
    }
}

#[salvo::async_trait]
impl DavEngine for LocalFsEngine {
    async fn is_collection(&self, path: &str) -> bool {
        let Some(target) = self.resolve(path) else {
            return false;
        };
        tokio::fs::metadata(target)
            .await
            .is_ok_and(|meta| meta.is_dir())
    }

    #[tracing::instrument(skip_all, fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn serve(&self, req: &mut Request, res: &mut Response) {
        let Some(path) = request_path(req) else {
            res.status_code(StatusCode::NOT_FOUND);
            return;
        };

        match req.method().as_str() {
            "OPTIONS" => method::options::options(res),
            "GET" | "HEAD" => method::get_head::get_head(self, req, res, &path).await,
            "PUT" => method::put::put(self, req, res, &path).await,
            "DELETE" => method::delete::delete(self, req, res, &path).await,
            "MKCOL" => method::mkcol::mkcol(self, req, res, &path).await,
            "COPY" => method::copy_move::copy_move(self, req, res, &path, false).await,
            "MOVE" => method::copy_move::copy_move(self, req, res, &path, true).await,
            "PROPFIND" => method::propfind::propfind(self, req, res, &path).await,
            "PROPPATCH" => method::propfind::proppatch(res),
            "LOCK" => method::lock::lock(self, req, res, &path).await,
            "UNLOCK" => method::lock::unlock(self, req, res, &path),
            other => {
                tracing::debug!(method = other, "Method not supported");
                method::set_allow(res);
                res.status_code(StatusCode::METHOD_NOT_ALLOWED);
            }
        }
    }
}

/// Lock tokens named in the `If` header, e.g. `(<opaquelocktoken:...>)`.
#[must_use]
pub fn submitted_tokens(req: &Request) -> Vec<String> {
    req.headers()
        .get_all("If")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(bracketed)
        .filter(|token| token.starts_with("opaquelocktoken:"))
        .map(str::to_string)
        .collect()
}

pub(crate) fn bracketed(value: &str) -> impl Iterator<Item = &str> {
    value
        .split('<')
        .skip(1)
        .filter_map(|part| part.split_once('>').map(|(inner, _)| inner.trim()))
}
