pub mod board;
pub mod cases;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;

use labdent_core::ServiceError;

use crate::workflow::WorkflowEngine;

/// Shared application state.
pub type EngineState = Arc<WorkflowEngine>;

/// Build the cases API router.
pub fn router(engine: EngineState) -> Router {
    Router::new()
        .nest("/v1", api_routes())
        .with_state(engine)
}

fn api_routes() -> Router<EngineState> {
    Router::new()
        .merge(cases::routes())
        .merge(board::routes())
}

/// Tenant scope of the request.
///
/// Authentication lives in the transport layer in front of this service;
/// by the time a request lands here its tenant is carried in a header.
pub(crate) fn tenant_id(headers: &HeaderMap) -> Result<String, ServiceError> {
    headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| ServiceError::Validation("x-tenant-id header is required".into()))
}

/// Acting user, if the transport forwarded one. Recorded in the audit trail.
pub(crate) fn actor_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
