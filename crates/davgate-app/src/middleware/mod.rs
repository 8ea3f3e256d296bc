//! Request pipeline stages, in the order they are mounted:
//! CORS, authentication, authorization.

pub mod auth;
pub mod authorize;
pub mod cors;

use salvo::http::StatusCode;
use salvo::{FlowCtrl, Response};

/// Ends the request with `status` and an empty body.
pub(crate) fn halt(res: &mut Response, ctrl: &mut FlowCtrl, status: StatusCode) {
    res.status_code(status);
    // an explicit empty body keeps the default catcher from rendering an error page
    res.body("");
    ctrl.skip_rest();
}
