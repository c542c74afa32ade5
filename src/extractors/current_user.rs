//! Resolve the authenticated customer from an `Authorization: Bearer <jwt>` header.

use crate::auth::AuthError;
use crate::error::AppError;
use crate::model::EntityKind;
use crate::service::CrudService;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use serde_json::Value;

/// The customer row behind a valid bearer token (sensitive columns excluded).
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub row: Value,
}

/// Token from an `Authorization` header using the bearer scheme (scheme is case-insensitive).
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingCredentials)?;
        let email = state.jwt.verify(token).map_err(|e| {
            tracing::debug!(reason = %e, "bearer token rejected");
            e
        })?;

        let customers = state.model.entity(EntityKind::Customers);
        let row = CrudService::find_one_by(&state.pool, customers, "email", &Value::String(email))
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let id = row
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Internal("customer row without id".into()))?;
        Ok(CurrentUser { id, row })
    }
}
