//! Shared handler plumbing: body/query parsing and the generic read/create/update/delete flows.

use crate::error::AppError;
use crate::model::{EntityDef, EntityKind, SqlType};
use crate::response::{created, success_many, success_one};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::HashMap;

pub type QueryParams = HashMap<String, String>;

pub fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub fn parse_id(name: &str, raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest(format!("{} must be a positive integer", name))),
    }
}

/// `?name=` when present and non-empty.
pub fn optional_id(params: &QueryParams, name: &str) -> Result<Option<i64>, AppError> {
    match params.get(name).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => parse_id(name, raw).map(Some),
        None => Ok(None),
    }
}

pub fn require_id(params: &QueryParams, name: &str) -> Result<i64, AppError> {
    optional_id(params, name)?.ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))
}

pub fn not_found(kind: EntityKind) -> AppError {
    AppError::NotFound(format!("{} not found", kind.singular()))
}

/// Coerce a query-string value to the JSON type of the column it filters.
fn query_value_for_column(entity: &EntityDef, col: &str, s: &str) -> Value {
    let sql_type = entity.column(col).map(|c| c.sql_type);
    match sql_type {
        Some(SqlType::Serial | SqlType::Integer) => {
            if let Ok(n) = s.parse::<i64>() {
                return Value::Number(n.into());
            }
        }
        Some(SqlType::Numeric) => {
            if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
        Some(SqlType::Boolean) => {
            if s.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if s.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
        }
        _ => {}
    }
    Value::String(s.to_string())
}

/// Column filters plus `limit`/`offset` from the query string. Unknown keys, sensitive
/// columns and `skip` (the id parameter) are ignored.
pub fn list_params(
    entity: &EntityDef,
    params: &QueryParams,
    skip: &str,
) -> (Vec<(String, Value)>, Option<u32>, Option<u32>) {
    let mut limit = None;
    let mut offset = None;
    let mut filters = Vec::new();
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    for k in keys {
        let v = &params[k];
        match k.as_str() {
            "limit" => limit = v.parse().ok(),
            "offset" => offset = v.parse().ok(),
            _ if k == skip => {}
            _ => {
                if entity.has_column(k) && !entity.is_sensitive(k) {
                    filters.push((k.clone(), query_value_for_column(entity, k, v)));
                }
            }
        }
    }
    (filters, limit, offset)
}

pub async fn fetch_one(state: &AppState, kind: EntityKind, id: i64) -> Result<Value, AppError> {
    let entity = state.model.entity(kind);
    CrudService::read(&state.pool, entity, id).await?.ok_or_else(|| not_found(kind))
}

/// `GET /<prefix>?<id_param>=` returns that row, otherwise the filtered list.
pub async fn read_or_list(
    state: &AppState,
    kind: EntityKind,
    params: &QueryParams,
    id_param: &str,
) -> Result<Response, AppError> {
    if let Some(id) = optional_id(params, id_param)? {
        let row = fetch_one(state, kind, id).await?;
        return Ok(success_one(row).into_response());
    }
    let entity = state.model.entity(kind);
    let (filters, limit, offset) = list_params(entity, params, id_param);
    let rows = CrudService::list(&state.pool, entity, &filters, limit, offset).await?;
    Ok(success_many(rows).into_response())
}

pub async fn create_row(
    state: &AppState,
    kind: EntityKind,
    body: HashMap<String, Value>,
) -> Result<Response, AppError> {
    let entity = state.model.entity(kind);
    RequestValidator::validate(&body, &entity.validation)?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    tracing::info!(table = %entity.table_name, id = ?row.get("id"), "created");
    Ok(created(row).into_response())
}

/// Partial update: only fields present in the body change.
pub async fn update_row(
    state: &AppState,
    kind: EntityKind,
    id: i64,
    body: HashMap<String, Value>,
) -> Result<Response, AppError> {
    let entity = state.model.entity(kind);
    RequestValidator::validate_partial(&body, &entity.validation)?;
    let row = CrudService::update(&state.pool, entity, id, &body)
        .await?
        .ok_or_else(|| not_found(kind))?;
    Ok(success_one(row).into_response())
}

pub async fn delete_row(state: &AppState, kind: EntityKind, id: i64) -> Result<Response, AppError> {
    let entity = state.model.entity(kind);
    let row = CrudService::delete(&state.pool, entity, id)
        .await?
        .ok_or_else(|| not_found(kind))?;
    tracing::info!(table = %entity.table_name, id, "deleted");
    Ok(success_one(row).into_response())
}
