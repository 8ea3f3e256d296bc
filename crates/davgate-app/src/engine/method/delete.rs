use salvo::http::StatusCode;
use salvo::{Request, Response};

use crate::engine::LocalFsEngine;

/// Removes a file or a whole collection and any locks below it.
pub async fn delete(engine: &LocalFsEngine, req: &Request, res: &mut Response, path: &str) {
    if let Err(status) = engine.ensure_unlocked(req, path) {
        res.status_code(status);
        return;
    }

    let Some(target) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };
    if target == engine.root() {
        res.status_code(StatusCode::FORBIDDEN);
        return;
    }

    let removed = match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&target).await,
        Ok(_) => tokio::fs::remove_file(&target).await,
        Err(e) => {
            tracing::debug!(error = %e, "Resource not found");
            res.status_code(StatusCode::NOT_FOUND);
            return;
        }
    };

    match removed {
        Ok(()) => {
            engine.locks().release_under(path);
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => {
            tracing::error!(error = %e, target = %target.display(), "Failed to delete");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
