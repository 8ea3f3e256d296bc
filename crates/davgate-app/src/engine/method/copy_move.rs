use std::path::Path;

use salvo::http::StatusCode;
use salvo::{Request, Response};

use crate::app::api::util::destination_path;
use crate::engine::LocalFsEngine;

/// ## Summary
/// Copies or moves `path` to the `Destination` header's path.
///
/// `Overwrite: F` turns an existing destination into 412; a missing destination
/// parent is 409. A new destination answers 201, a replaced one 204. `COPY`
/// honours `Depth: 0` for collections; `MOVE` always moves the whole tree.
pub async fn copy_move(
    engine: &LocalFsEngine,
    req: &Request,
    res: &mut Response,
    path: &str,
    is_move: bool,
) {
    let Some(dest_path) = destination_path(req) else {
        tracing::debug!("Missing or malformed Destination header");
        res.status_code(StatusCode::BAD_REQUEST);
        return;
    };

    let Some(source) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };
    let Some(dest) = engine.resolve(&dest_path) else {
        res.status_code(StatusCode::FORBIDDEN);
        return;
    };
    if source == dest || dest == engine.root() || (is_move && source == engine.root()) {
        res.status_code(StatusCode::FORBIDDEN);
        return;
    }

    let source_meta = match tokio::fs::metadata(&source).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(error = %e, "Source not found");
            res.status_code(StatusCode::NOT_FOUND);
            return;
        }
    };
    if source_meta.is_dir() && dest.starts_with(&source) {
        res.status_code(StatusCode::FORBIDDEN);
        return;
    }

    if is_move && let Err(status) = engine.ensure_unlocked(req, path) {
        res.status_code(status);
        return;
    }
    if let Err(status) = engine.ensure_unlocked(req, &dest_path) {
        res.status_code(status);
        return;
    }

    if !super::parent_exists(&dest).await {
        res.status_code(StatusCode::CONFLICT);
        return;
    }

    let overwrite = req
        .headers()
        .get("Overwrite")
        .and_then(|v| v.to_str().ok())
        .is_none_or(|v| !v.trim().eq_ignore_ascii_case("F"));

    let dest_existed = match tokio::fs::metadata(&dest).await {
        Ok(meta) => {
            if !overwrite {
                res.status_code(StatusCode::PRECONDITION_FAILED);
                return;
            }
            let cleared = if meta.is_dir() {
                tokio::fs::remove_dir_all(&dest).await
            } else {
                tokio::fs::remove_file(&dest).await
            };
            if let Err(e) = cleared {
                tracing::error!(error = %e, dest = %dest.display(), "Failed to clear destination");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
            engine.locks().release_under(&dest_path);
            true
        }
        Err(_) => false,
    };

    let result = if is_move {
        tokio::fs::rename(&source, &dest).await
    } else {
        let shallow = req
            .headers()
            .get("Depth")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");
        copy_tree(&source, &dest, !shallow).await
    };

    if let Err(e) = result {
        tracing::error!(error = %e, dest = %dest.display(), is_move, "Transfer failed");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    }

    if is_move {
        engine.locks().release_under(path);
    }
    res.status_code(if dest_existed {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::CREATED
    });
}

async fn copy_tree(source: &Path, dest: &Path, recursive: bool) -> std::io::Result<()> {
    if !tokio::fs::metadata(source).await?.is_dir() {
        tokio::fs::copy(source, dest).await?;
        return Ok(());
    }

    let mut pending = vec![(source.to_path_buf(), dest.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir(&to).await?;
        if !recursive {
            continue;
        }
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}
