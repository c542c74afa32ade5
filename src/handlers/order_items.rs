//! Order line items. Prices always come from the referenced product.

use super::common::{
    body_to_map, create_row, delete_row, fetch_one, read_or_list, require_id, update_row, QueryParams,
};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::model::{EntityKind, ValidationRule};
use crate::service::{as_number, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const ID: &str = "order_item_id";
const INPUT_FIELDS: [&str; 3] = ["order_id", "product_id", "quantity"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub unit_price: f64,
    pub total_price: f64,
}

/// Unit price is the product's base price; total is rounded to cents.
pub fn price_line(product: &Value, quantity: i64) -> Result<Pricing, AppError> {
    if product.get("active").and_then(Value::as_bool) == Some(false) {
        return Err(AppError::BadRequest("Product is not active".into()));
    }
    let unit_price = product
        .get("base_price")
        .and_then(as_number)
        .ok_or_else(|| AppError::Internal("product without base_price".into()))?;
    let total_price = (quantity as f64 * unit_price * 100.0).round() / 100.0;
    Ok(Pricing { unit_price, total_price })
}

/// Keep only client-settable fields and check them against the catalog rules.
fn input_body(
    state: &AppState,
    body: Value,
    partial: bool,
) -> Result<HashMap<String, Value>, AppError> {
    let entity = state.model.entity(EntityKind::OrderItems);
    let mut body = body_to_map(body)?;
    body.retain(|k, _| INPUT_FIELDS.contains(&k.as_str()));
    let rules: HashMap<String, ValidationRule> = INPUT_FIELDS
        .iter()
        .filter_map(|f| entity.validation.get(*f).map(|r| (f.to_string(), r.clone())))
        .collect();
    if partial {
        RequestValidator::validate_partial(&body, &rules)?;
    } else {
        RequestValidator::validate(&body, &rules)?;
    }
    Ok(body)
}

async fn apply_pricing(
    state: &AppState,
    body: &mut HashMap<String, Value>,
    product_id: i64,
    quantity: i64,
) -> Result<(), AppError> {
    let product = fetch_one(state, EntityKind::Products, product_id).await?;
    let pricing = price_line(&product, quantity)?;
    body.insert("unit_price".into(), Value::from(pricing.unit_price));
    body.insert("total_price".into(), Value::from(pricing.total_price));
    Ok(())
}

fn int_field(row: &Value, body: &HashMap<String, Value>, name: &str) -> Result<i64, AppError> {
    body.get(name)
        .or_else(|| row.get(name))
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Validation(format!("{} is required", name)))
}

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    read_or_list(&state, EntityKind::OrderItems, &params, ID).await
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let mut body = input_body(&state, body, false)?;
    let empty = Value::Null;
    let product_id = int_field(&empty, &body, "product_id")?;
    let quantity = int_field(&empty, &body, "quantity")?;
    apply_pricing(&state, &mut body, product_id, quantity).await?;
    create_row(&state, EntityKind::OrderItems, body).await
}

/// Prices are recomputed from the (possibly new) product and quantity.
pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    let mut body = input_body(&state, body, true)?;
    let existing = fetch_one(&state, EntityKind::OrderItems, id).await?;
    let product_id = int_field(&existing, &body, "product_id")?;
    let quantity = int_field(&existing, &body, "quantity")?;
    apply_pricing(&state, &mut body, product_id, quantity).await?;
    update_row(&state, EntityKind::OrderItems, id, body).await
}

pub async fn delete(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    let id = require_id(&params, ID)?;
    delete_row(&state, EntityKind::OrderItems, id).await
}
