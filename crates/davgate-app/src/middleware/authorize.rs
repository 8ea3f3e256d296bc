use salvo::http::StatusCode;
use salvo::{Depot, FlowCtrl, Request, Response};

use davgate_service::auth::{AuthzResult, authorize, get_principal_from_depot};

use crate::app::api::util::{destination_path, request_path};

/// Applies path rules and the modify gate to the effective principal. For
/// `COPY` and `MOVE` the `Destination` path must pass as well.
pub struct AuthorizeMiddleware;

#[salvo::async_trait]
impl salvo::Handler for AuthorizeMiddleware {
    #[tracing::instrument(skip_all, fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let principal = get_principal_from_depot(depot);
        let method = req.method().as_str();
        let Some(path) = request_path(req) else {
            tracing::debug!("Path climbs above the root");
            super::halt(res, ctrl, StatusCode::NOT_FOUND);
            return;
        };

        let mut verdict = authorize(principal.as_deref(), &path, method);

        if verdict.is_allowed()
            && matches!(method, "COPY" | "MOVE")
            && let Some(destination) = destination_path(req)
        {
            verdict = authorize(principal.as_deref(), &destination, method);
        }

        if let AuthzResult::Denied(reason) = verdict {
            tracing::debug!(
                principal = principal.as_deref().map(|p| p.key().to_string()),
                reason = %reason,
                "Request denied"
            );
            super::halt(res, ctrl, StatusCode::FORBIDDEN);
        }
    }
}
