use std::fs::Metadata;
use std::path::Path;

use salvo::http::StatusCode;
use salvo::{Request, Response};

use crate::engine::LocalFsEngine;
use crate::engine::xml::{self, PropEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Zero,
    One,
}

/// ## Summary
/// Lists the live properties of `path` and, with `Depth: 1`, of its members.
///
/// A missing or infinite depth is refused with the `propfind-finite-depth`
/// precondition. The request body is not inspected; every live property is
/// always returned.
pub async fn propfind(engine: &LocalFsEngine, req: &Request, res: &mut Response, path: &str) {
    let depth = match req
        .headers()
        .get("Depth")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
    {
        Some("0") => Depth::Zero,
        Some("1") => Depth::One,
        other => {
            tracing::debug!(depth = ?other, "Refusing infinite PROPFIND");
            super::render_xml(
                res,
                StatusCode::FORBIDDEN,
                xml::error_body("propfind-finite-depth"),
            );
            return;
        }
    };

    let Some(target) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };
    let meta = match tokio::fs::metadata(&target).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(error = %e, "Resource not found");
            res.status_code(StatusCode::NOT_FOUND);
            return;
        }
    };

    let mut entries = vec![prop_entry(engine, path, &target, &meta)];

    if depth == Depth::One && meta.is_dir() {
        match members(engine, path, &target).await {
            Ok(mut children) => entries.append(&mut children),
            Err(e) => {
                tracing::error!(error = %e, target = %target.display(), "Failed to list collection");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        }
    }

    tracing::debug!(entries = entries.len(), "PROPFIND listing");
    super::render_xml(res, StatusCode::MULTI_STATUS, xml::multistatus(&entries));
}

/// Dead properties are not stored.
pub fn proppatch(res: &mut Response) {
    res.status_code(StatusCode::FORBIDDEN);
}

async fn members(
    engine: &LocalFsEngine,
    path: &str,
    target: &Path,
) -> std::io::Result<Vec<PropEntry>> {
    let mut children = Vec::new();
    let mut dir = tokio::fs::read_dir(target).await?;
    while let Some(entry) = dir.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(entry = ?entry.path(), "Skipping non UTF-8 file name");
            continue;
        };
        let meta = entry.metadata().await?;
        let child = format!("{}/{name}", path.trim_end_matches('/'));
        children.push(prop_entry(engine, &child, &entry.path(), &meta));
    }
    children.sort_by(|a, b| a.href.cmp(&b.href));
    Ok(children)
}

fn prop_entry(engine: &LocalFsEngine, path: &str, target: &Path, meta: &Metadata) -> PropEntry {
    let collection = meta.is_dir();
    let display_name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    PropEntry {
        href: xml::href(path, collection),
        display_name,
        collection,
        content_length: (!collection).then(|| meta.len()),
        content_type: (!collection).then(|| xml::content_type_for(target)),
        modified: meta.modified().ok(),
        locks: engine.locks().locks_on(path),
    }
}
