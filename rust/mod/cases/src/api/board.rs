//! GET /board — the Kanban projection.
//!
//! Derived data: grouped and ordered on every read, never cached. A stage
//! move or drag invalidates whatever a client last fetched; clients re-read.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use labdent_core::ServiceError;

use crate::model::BoardColumn;

use super::{tenant_id, EngineState};

pub fn routes() -> Router<EngineState> {
    Router::new().route("/board", get(board))
}

async fn board(
    State(engine): State<EngineState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BoardColumn>>, ServiceError> {
    let tenant = tenant_id(&headers)?;
    let columns = engine.board(&tenant)?;
    Ok(Json(columns))
}
