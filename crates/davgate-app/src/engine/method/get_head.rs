use salvo::fs::NamedFile;
use salvo::http::StatusCode;
use salvo::{Request, Response};

use crate::engine::LocalFsEngine;

/// ## Summary
/// Streams a file with range and conditional support. Collections answer 405;
/// a plain `GET` on a collection never gets here because the dispatcher turns
/// it into a listing.
pub async fn get_head(engine: &LocalFsEngine, req: &Request, res: &mut Response, path: &str) {
    let Some(target) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };

    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => {
            super::set_allow(res);
            res.status_code(StatusCode::METHOD_NOT_ALLOWED);
        }
        Ok(_) => {
            NamedFile::builder(target).send(req.headers(), res).await;
        }
        Err(e) => {
            tracing::debug!(error = %e, "Resource not found");
            res.status_code(StatusCode::NOT_FOUND);
        }
    }
}
