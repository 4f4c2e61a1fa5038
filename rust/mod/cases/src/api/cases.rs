//! Case endpoints: creation, reads, stage moves, board drags, delivery,
//! cancellation, assignment.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use labdent_core::{ListResult, ServiceError};

use crate::model::{
    AssignRequest, CancelRequest, Case, CaseDetail, CaseListQuery, CreateCaseRequest,
    DeliverRequest, MoveStageRequest, UpdateStatusRequest,
};

use super::{actor_id, tenant_id, EngineState};

pub fn routes() -> Router<EngineState> {
    Router::new()
        .route("/cases", post(create_case).get(list_cases))
        .route("/cases/{id}", get(get_case))
        .route("/cases/{id}/stages/{stage_id}/@move", post(move_stage))
        .route("/cases/{id}/@status", post(update_status))
        .route("/cases/{id}/@deliver", post(deliver))
        .route("/cases/{id}/@cancel", post(cancel))
        .route("/cases/{id}/@assign", post(assign))
}

// ---------------------------------------------------------------------------
// POST /cases
// ---------------------------------------------------------------------------

async fn create_case(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Json(req): Json<CreateCaseRequest>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let actor = actor_id(&headers);
    let detail = engine.create_case(&tenant, &req, actor.as_deref())?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// GET /cases
// ---------------------------------------------------------------------------

async fn list_cases(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Query(query): Query<CaseListQuery>,
) -> Result<Json<ListResult<Case>>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let (items, total) = engine.list_cases(&tenant, &query)?;
    Ok(Json(ListResult { items, total }))
}

// ---------------------------------------------------------------------------
// GET /cases/:id
// ---------------------------------------------------------------------------

async fn get_case(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let detail = engine.get_case(&tenant, &id)?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /cases/:id/stages/:stage_id/@move
// ---------------------------------------------------------------------------

async fn move_stage(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Path((id, stage_id)): Path<(String, String)>,
    Json(req): Json<MoveStageRequest>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let actor = actor_id(&headers);
    let detail = engine.move_stage(&tenant, &id, &stage_id, &req, actor.as_deref())?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /cases/:id/@status — Kanban drag target
// ---------------------------------------------------------------------------

async fn update_status(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let actor = actor_id(&headers);
    let detail = engine.update_status(&tenant, &id, req.status, actor.as_deref())?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /cases/:id/@deliver
// ---------------------------------------------------------------------------

async fn deliver(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<DeliverRequest>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let actor = actor_id(&headers);
    let detail = engine.deliver(&tenant, &id, &req.delivery_method, actor.as_deref())?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /cases/:id/@cancel
// ---------------------------------------------------------------------------

async fn cancel(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let actor = actor_id(&headers);
    let detail = engine.cancel(&tenant, &id, req.reason.as_deref(), actor.as_deref())?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /cases/:id/@assign
// ---------------------------------------------------------------------------

async fn assign(
    State(engine): State<EngineState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<CaseDetail>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let actor = actor_id(&headers);
    let detail = engine.assign(&tenant, &id, req.assigned_to.as_deref(), actor.as_deref())?;
    Ok(Json(detail))
}
