//! Contracts, one per event. Documents are stored as a file reference in `pdf_file`.

use super::common::{body_to_map, create_row, not_found, require_id, QueryParams};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::model::EntityKind;
use crate::response::success_one;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

const LOOKUP: &str = "event_id";
const ID: &str = "contract_id";

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    create_row(&state, EntityKind::Contracts, body_to_map(body)?).await
}

/// GET /contracts?event_id=
pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    let key = require_id(&params, LOOKUP)?;
    let entity = state.model.entity(EntityKind::Contracts);
    let row = CrudService::find_one_by(&state.pool, entity, LOOKUP, &Value::from(key))
        .await?
        .ok_or_else(|| not_found(EntityKind::Contracts))?;
    Ok(success_one(row).into_response())
}

/// GET /contracts/download?contract_id=
pub async fn download(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    let entity = state.model.entity(EntityKind::Contracts);
    let pdf_file = CrudService::fetch_column(&state.pool, entity, "id", &Value::from(id), "pdf_file")
        .await?
        .filter(|v| v.as_str().map_or(false, |s| !s.is_empty()))
        .ok_or_else(|| AppError::NotFound("Contract PDF not found".into()))?;
    Ok(success_one(json!({ "pdf_file": pdf_file })).into_response())
}
