pub mod dispatch;
pub mod util;

use std::sync::Arc;

use salvo::Router;

use davgate_service::gate::Gate;

use crate::gate::GateHandler;
use crate::middleware::{
    auth::AuthMiddleware, authorize::AuthorizeMiddleware, cors::CorsMiddleware,
};

/// ## Summary
/// Builds the request pipeline: gate injection, CORS, authentication and
/// authorization in front of the dispatcher, for every path and method.
#[must_use]
pub fn routes(gate: Arc<Gate>) -> Router {
    Router::new()
        .hoop(GateHandler::new(gate))
        .hoop(CorsMiddleware)
        .hoop(AuthMiddleware)
        .hoop(AuthorizeMiddleware)
        .goal(dispatch::delegate)
        .push(Router::with_path("{**rest}").goal(dispatch::delegate))
}
