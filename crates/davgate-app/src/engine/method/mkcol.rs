use salvo::http::StatusCode;
use salvo::http::header::CONTENT_LENGTH;
use salvo::{Request, Response};

use crate::engine::LocalFsEngine;

pub async fn mkcol(engine: &LocalFsEngine, req: &Request, res: &mut Response, path: &str) {
    let has_body = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > 0);
    if has_body {
        res.status_code(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        return;
    }

    if let Err(status) = engine.ensure_unlocked(req, path) {
        res.status_code(status);
        return;
    }

    let Some(target) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };

    if tokio::fs::metadata(&target).await.is_ok() {
        super::set_allow(res);
        res.status_code(StatusCode::METHOD_NOT_ALLOWED);
        return;
    }
    if !super::parent_exists(&target).await {
        res.status_code(StatusCode::CONFLICT);
        return;
    }

    match tokio::fs::create_dir(&target).await {
        Ok(()) => {
            res.status_code(StatusCode::CREATED);
        }
        Err(e) => {
            tracing::error!(error = %e, target = %target.display(), "Failed to create collection");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
