//! Catalog products offered to events.

use super::common::{body_to_map, create_row, delete_row, read_or_list, require_id, update_row, QueryParams};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::model::EntityKind;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use serde_json::Value;

const ID: &str = "product_id";

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    read_or_list(&state, EntityKind::Products, &params, ID).await
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    create_row(&state, EntityKind::Products, body_to_map(body)?).await
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    update_row(&state, EntityKind::Products, id, body_to_map(body)?).await
}

pub async fn delete(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    delete_row(&state, EntityKind::Products, id).await
}
