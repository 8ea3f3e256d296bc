use std::sync::Arc;

use salvo::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use salvo::http::{HeaderValue, StatusCode};
use salvo::{Depot, FlowCtrl, Request, Response};

use davgate_service::auth::{Credentials, insert_principal_into_depot};

use crate::gate::get_gate_from_depot;

/// ## Summary
/// Authenticates the request and stores the effective principal in the depot.
///
/// With authentication enabled the challenge header is set up front, so it is
/// present on every response including the 401.
///
/// ## Errors
/// Returns an HTTP 401 Unauthorized response if authentication fails.
pub struct AuthMiddleware;

#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
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

        if gate.auth_enabled() {
            match HeaderValue::from_str(&gate.challenge()) {
                Ok(challenge) => {
                    res.headers_mut().insert(WWW_AUTHENTICATE, challenge);
                }
                Err(e) => {
                    tracing::warn!(error = %e, realm = %gate.realm(), "Realm is not a valid header value");
                }
            }
        }

        let credentials = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Credentials::from_authorization);

        // hashed secret checks are CPU bound
        let verifier = Arc::clone(&gate);
        let outcome = match tokio::task::spawn_blocking(move || {
            verifier.authenticate(credentials.as_ref())
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Authentication task failed");
                super::halt(res, ctrl, StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        };

        if !outcome.authorized {
            super::halt(res, ctrl, StatusCode::UNAUTHORIZED);
            return;
        }

        let principal = gate.effective_principal(&outcome);
        tracing::trace!(
            principal = principal.as_deref().map(|p| p.key().to_string()),
            "Effective principal resolved"
        );
        insert_principal_into_depot(depot, principal);
    }
}
