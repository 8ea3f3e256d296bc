use salvo::http::header::ORIGIN;
use salvo::http::{Method, StatusCode};
use salvo::{Depot, FlowCtrl, Request, Response};

use crate::gate::get_gate_from_depot;

/// Emits CORS headers before authentication runs, so that preflights and
/// rejected requests still carry them. A preflight ends here.
pub struct CorsMiddleware;

#[salvo::async_trait]
impl salvo::Handler for CorsMiddleware {
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
        let gate = match get_gate_from_depot(depot) {
            Ok(gate) => gate,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to get gate from depot");
                super::halt(res, ctrl, StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        };

        let origin = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
        if !gate.cors().applies(origin) {
            return;
        }

        let headers = gate.cors().negotiate(origin);
        tracing::trace!(allowed = !headers.is_empty(), "CORS negotiated");
        headers.apply(res.headers_mut());

        if req.method() == Method::OPTIONS {
            tracing::debug!("Answering CORS preflight");
            res.status_code(StatusCode::OK);
            ctrl.skip_rest();
        }
    }
}
