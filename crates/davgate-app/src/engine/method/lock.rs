use std::time::Duration;

use salvo::http::{HeaderValue, StatusCode};
use salvo::{Request, Response};

use davgate_service::engine::LockDepth;

use crate::engine::lockinfo::parse_lockinfo;
use crate::engine::xml::lock_response;
use crate::engine::{LocalFsEngine, bracketed, submitted_tokens};

const MAX_LOCK_BODY: usize = 64 * 1024;

/// Largest `Second-N` timeout honoured, 2^32 - 1.
const MAX_TIMEOUT_SECS: u64 = 4_294_967_295;

/// ## Summary
/// Takes a new exclusive write lock, or refreshes one when the body is empty.
///
/// A lock on a missing resource creates it empty and answers 201. Conflicts
/// answer 423; a refresh with an unknown token answers 412; a body that is not
/// a `lockinfo` document answers 400.
pub async fn lock(engine: &LocalFsEngine, req: &mut Request, res: &mut Response, path: &str) {
    let timeout = parse_timeout(req);

    let body = match req.payload_with_max_size(MAX_LOCK_BODY).await {
        Ok(body) => body.clone(),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read LOCK body");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        refresh(engine, req, res, path, timeout);
        return;
    }

    let depth = match req.headers().get("Depth").and_then(|v| v.to_str().ok()) {
        Some(v) if v.trim() == "0" => LockDepth::Zero,
        _ => LockDepth::Infinity,
    };
    let owner = match parse_lockinfo(&body) {
        Ok(info) => info.owner,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed LOCK body");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    let Some(target) = engine.resolve(path) else {
        res.status_code(StatusCode::NOT_FOUND);
        return;
    };
    let exists = tokio::fs::metadata(&target).await.is_ok();
    if !exists && !super::parent_exists(&target).await {
        res.status_code(StatusCode::CONFLICT);
        return;
    }

    let lock = match engine.locks().lock(path, depth, timeout, owner) {
        Ok(lock) => lock,
        Err(e) => {
            tracing::debug!(error = %e, "Lock conflict");
            res.status_code(StatusCode::LOCKED);
            return;
        }
    };

    if !exists && let Err(e) = tokio::fs::write(&target, b"").await {
        tracing::error!(error = %e, target = %target.display(), "Failed to create locked resource");
        if let Err(e) = engine.locks().unlock(path, &lock.token) {
            tracing::warn!(error = %e, "Failed to release lock after create failure");
        }
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    }

    set_lock_token(res, &lock.token);
    super::render_xml(
        res,
        if exists {
            StatusCode::OK
        } else {
            StatusCode::CREATED
        },
        lock_response(&lock),
    );
}

fn refresh(
    engine: &LocalFsEngine,
    req: &Request,
    res: &mut Response,
    path: &str,
    timeout: Option<Duration>,
) {
    let tokens = submitted_tokens(req);
    let Some(token) = tokens.first() else {
        tracing::debug!("LOCK refresh without a token");
        res.status_code(StatusCode::BAD_REQUEST);
        return;
    };

    match engine.locks().refresh(path, token, timeout) {
        Ok(lock) => super::render_xml(res, StatusCode::OK, lock_response(&lock)),
        Err(e) => {
            tracing::debug!(error = %e, "Refresh failed");
            res.status_code(StatusCode::PRECONDITION_FAILED);
        }
    }
}

pub fn unlock(engine: &LocalFsEngine, req: &Request, res: &mut Response, path: &str) {
    let Some(token) = req
        .headers()
        .get("Lock-Token")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| bracketed(v).next())
        .map(str::to_string)
    else {
        res.status_code(StatusCode::BAD_REQUEST);
        return;
    };

    match engine.locks().unlock(path, &token) {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Unlock failed");
            res.status_code(StatusCode::CONFLICT);
        }
    }
}

/// First usable entry of the `Timeout` header; `None` is infinite.
fn parse_timeout(req: &Request) -> Option<Duration> {
    req.headers()
        .get("Timeout")
        .and_then(|v| v.to_str().ok())
        .and_then(timeout_from)
}

/// `Second-N` values beyond [`MAX_TIMEOUT_SECS`], however many digits, are capped.
fn timeout_from(value: &str) -> Option<Duration> {
    value.split(',').map(str::trim).find_map(|entry| {
        entry
            .strip_prefix("Second-")
            .filter(|secs| !secs.is_empty() && secs.bytes().all(|b| b.is_ascii_digit()))
            .map(|secs| {
                secs.parse::<u64>()
                    .map_or(MAX_TIMEOUT_SECS, |n| n.min(MAX_TIMEOUT_SECS))
            })
            .map(Duration::from_secs)
    })
}

fn set_lock_token(res: &mut Response, token: &str) {
    match HeaderValue::from_str(&format!("<{token}>")) {
        Ok(value) => {
            res.headers_mut().insert("lock-token", value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Lock token is not a valid header value");
        }
    }
}
