//! Payments. Lookup requires an explicit `payment_id`; payments are never deleted through the API.

use super::common::{body_to_map, create_row, fetch_one, require_id, update_row, QueryParams};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::model::EntityKind;
use crate::response::success_one;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

const ID: &str = "payment_id";

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    create_row(&state, EntityKind::Payments, body_to_map(body)?).await
}

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    let row = fetch_one(&state, EntityKind::Payments, id).await?;
    Ok(success_one(row).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    update_row(&state, EntityKind::Payments, id, body_to_map(body)?).await
}
