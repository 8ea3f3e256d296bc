use salvo::http::header::HeaderName;
use salvo::http::{HeaderValue, Method, ResBody, StatusCode};
use salvo::{Depot, Request, Response, handler};

use davgate_service::auth::get_principal_from_depot;

use super::util::request_path;
use crate::gate::get_gate_from_depot;

/// ## Summary
/// Hands an authorized request to the principal's engine.
///
/// A `GET` on a collection becomes a `PROPFIND` (with `Depth: 1` unless the
/// client sent a depth), and a `HEAD` response loses its body. Everything the
/// engine produces is passed through as is.
#[handler]
#[tracing::instrument(skip_all, fields(
    method = %req.method(),
    path = %req.uri().path()
))]
pub async fn delegate(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let gate = match get_gate_from_depot(depot) {
        Ok(gate) => gate,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to get gate from depot");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    let Some(principal) = get_principal_from_depot(depot) else {
        tracing::debug!("No principal reached the dispatcher");
        res.status_code(StatusCode::FORBIDDEN);
        res.body("");
        return;
    };

    let handle = match gate.handler_for(&principal).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, principal = %principal.key(), "Failed to build engine");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    if req.method() == Method::GET
        && let Some(path) = request_path(req)
        && handle.engine().is_collection(&path).await
    {
        rewrite_to_listing(req);
    }

    let head = req.method() == Method::HEAD;

    handle.engine().serve(req, res).await;

    if head {
        res.body(ResBody::None);
    }
}

fn rewrite_to_listing(req: &mut Request) {
    match Method::from_bytes(b"PROPFIND") {
        Ok(propfind) => *req.method_mut() = propfind,
        Err(e) => {
            tracing::error!(error = %e, "PROPFIND is not a valid method token");
            return;
        }
    }

    if !req.headers().contains_key("Depth") {
        req.headers_mut()
            .insert(HeaderName::from_static("depth"), HeaderValue::from_static("1"));
    }
    tracing::debug!("GET on collection rewritten to PROPFIND");
}
