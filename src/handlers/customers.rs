//! Customer CRUD, `/customers/me` and per-customer related data.

use super::auth::{hash_into_body, take_password};
use super::common::{body_to_map, delete_row, parse_id, read_or_list, require_id, update_row, QueryParams};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::model::EntityKind;
use crate::response::{success_many, success_one};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

const ID: &str = "customer_id";

/// Tables reachable from a customer through `/customers/{id}/<table>`.
const RELATED: [EntityKind; 6] = [
    EntityKind::Events,
    EntityKind::Orders,
    EntityKind::OrderItems,
    EntityKind::Payments,
    EntityKind::Invoices,
    EntityKind::Contracts,
];

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    read_or_list(&state, EntityKind::Customers, &params, ID).await
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    let mut body = body_to_map(body)?;
    match take_password(&mut body) {
        Some(password) if !password.is_null() => hash_into_body(&mut body, &password)?,
        _ => {}
    }
    update_row(&state, EntityKind::Customers, id, body).await
}

pub async fn delete(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    delete_row(&state, EntityKind::Customers, id).await
}

/// GET /customers/me
pub async fn me(user: CurrentUser) -> impl IntoResponse {
    success_one(user.row)
}

/// GET /customers/{customer_id}/{events|orders|order_items|payments|invoices|contracts}
pub async fn related(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((customer_id, table)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let customer_id = parse_id(ID, &customer_id)?;
    let kind = EntityKind::from_table_name(&table)
        .filter(|k| RELATED.contains(k))
        .ok_or_else(|| AppError::NotFound(format!("unknown customer resource: {}", table)))?;
    let path = state
        .model
        .owner_path(kind, EntityKind::Customers)
        .ok_or_else(|| AppError::Internal(format!("{} is not linked to customers", table)))?;
    let rows = CrudService::list_owned_by(&state.pool, &path, customer_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(format!("No {} found for this customer.", kind.label())));
    }
    Ok(success_many(rows).into_response())
}
