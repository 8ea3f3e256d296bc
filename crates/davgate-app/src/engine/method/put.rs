use salvo::http::StatusCode;
use salvo::http::header::CONTENT_LENGTH;
use salvo::{Request, Response};

use crate::engine::LocalFsEngine;

/// ## Summary
/// Stores the request body at `path`.
///
/// Answers 201 for a new resource, 204 for a replaced one, 409 when the parent
/// collection is missing, 405 when `path` is a collection and 413 when the
/// body exceeds the upload limit.
pub async fn put(engine: &LocalFsEngine, req: &mut Request, res: &mut Response, path: &str) {
    if let Err(status) = engine.ensure_unlocked(req, path) {
        res.status_code(status);
        return;
    }

    let Some(target) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };

    let existed = match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => {
            res.status_code(StatusCode::METHOD_NOT_ALLOWED);
            return;
        }
        Ok(_) => true,
        Err(_) => false,
    };

    if !super::parent_exists(&target).await {
        res.status_code(StatusCode::CONFLICT);
        return;
    }

    let limit = engine.max_upload_bytes();
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit) {
        tracing::debug!(declared, limit, "Upload exceeds limit");
        res.status_code(StatusCode::PAYLOAD_TOO_LARGE);
        return;
    }

    let body = match req
        .payload_with_max_size(usize::try_from(limit).unwrap_or(usize::MAX))
        .await
    {
        Ok(body) => body.clone(),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read upload");
            res.status_code(StatusCode::PAYLOAD_TOO_LARGE);
            return;
        }
    };

    if let Err(e) = tokio::fs::write(&target, &body).await {
        tracing::error!(error = %e, target = %target.display(), "Failed to write file");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    }

    tracing::debug!(bytes = body.len(), existed, "Stored resource");
    res.status_code(if existed {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::CREATED
    });
}
