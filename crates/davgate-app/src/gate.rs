use std::sync::Arc;

use salvo::async_trait;

use davgate_service::gate::Gate;

use crate::error::{AppError, AppResult};

/// Makes the shared [`Gate`] available to every handler in the chain.
pub struct GateHandler {
    gate: Arc<Gate>,
}

impl GateHandler {
    #[must_use]
    pub const fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl salvo::Handler for GateHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.gate));
    }
}

/// ## Summary
/// Retrieves the shared gate from the depot.
///
/// ## Errors
/// Returns an error if the gate is not found in the depot.
pub fn get_gate_from_depot(depot: &salvo::Depot) -> AppResult<Arc<Gate>> {
    depot.obtain::<Arc<Gate>>().cloned().map_err(|_err| {
        AppError::CoreError(davgate_core::error::CoreError::InvariantViolation(
            "Gate not found in depot",
        ))
    })
}
