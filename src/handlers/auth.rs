//! Sign-up and OAuth2 password-flow login.

use super::common::body_to_map;
use crate::auth::{hash_password, validate_password_strength, verify_password, TokenResponse};
use crate::error::AppError;
use crate::model::EntityKind;
use crate::response::created;
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Form, Json};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const INVALID_LOGIN: &str = "Invalid email or password";
/// Role given to every self-registered customer.
const SIGN_UP_ROLE: &str = "customer";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Pull the plaintext password out of a customer body. `password` wins over `password_hash`.
pub(crate) fn take_password(body: &mut HashMap<String, Value>) -> Option<Value> {
    let from_password = body.remove("password");
    let from_hash = body.remove("password_hash");
    from_password.or(from_hash)
}

/// Public sign-up never chooses its own role.
pub(crate) fn force_sign_up_role(body: &mut HashMap<String, Value>) {
    body.insert("role".into(), Value::String(SIGN_UP_ROLE.into()));
}

/// Check the password policy and replace the plaintext with its Argon2 hash.
pub(crate) fn hash_into_body(body: &mut HashMap<String, Value>, password: &Value) -> Result<(), AppError> {
    let plain = password
        .as_str()
        .ok_or_else(|| AppError::Validation("password must be a string".into()))?;
    validate_password_strength(plain)?;
    body.insert("password_hash".into(), Value::String(hash_password(plain)?));
    Ok(())
}

/// POST /auth/register and POST /customers.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let customers = state.model.entity(EntityKind::Customers);
    let mut body = body_to_map(body)?;
    force_sign_up_role(&mut body);
    let password = take_password(&mut body)
        .filter(|p| !p.is_null())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;

    // Rules run against the plaintext so a missing or empty password is reported before hashing.
    body.insert("password_hash".into(), password.clone());
    RequestValidator::validate(&body, &customers.validation)?;
    hash_into_body(&mut body, &password)?;

    let row = CrudService::create(&state.pool, customers, &body).await?;
    tracing::info!(email = ?row.get("email"), "customer registered");
    Ok(created(row))
}

/// POST /auth/login (form `username`, `password`).
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let customers = state.model.entity(EntityKind::Customers);
    let email = Value::String(form.username.trim().to_string());
    let stored = CrudService::fetch_column(&state.pool, customers, "email", &email, "password_hash").await?;
    let Some(Value::String(stored_hash)) = stored else {
        tracing::warn!(username = %form.username, "login for unknown email");
        return Err(AppError::BadRequest(INVALID_LOGIN.into()));
    };
    if !verify_password(&form.password, &stored_hash) {
        tracing::warn!(username = %form.username, "login with wrong password");
        return Err(AppError::BadRequest(INVALID_LOGIN.into()));
    }
    let access_token = state.jwt.issue(form.username.trim())?;
    tracing::info!(username = %form.username, "login succeeded");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_key_takes_precedence() {
        let mut body: HashMap<String, Value> =
            [("password".to_string(), json!("one")), ("password_hash".to_string(), json!("two"))].into();
        assert_eq!(take_password(&mut body), Some(json!("one")));
        assert!(body.is_empty());

        let mut body: HashMap<String, Value> = [("password_hash".to_string(), json!("two"))].into();
        assert_eq!(take_password(&mut body), Some(json!("two")));
    }

    #[test]
    fn sign_up_role_is_always_customer() {
        let mut body: HashMap<String, Value> = [("role".to_string(), json!("admin"))].into();
        force_sign_up_role(&mut body);
        assert_eq!(body["role"], json!("customer"));

        let mut body = HashMap::new();
        force_sign_up_role(&mut body);
        assert_eq!(body["role"], json!("customer"));
    }

    #[test]
    fn hashing_enforces_policy() {
        let mut body = HashMap::new();
        let err = hash_into_body(&mut body, &json!("123")).unwrap_err();
        assert_eq!(err.to_string(), "The password must be at least 6 characters long.");
        assert!(body.is_empty());

        hash_into_body(&mut body, &json!("StrongPass")).unwrap();
        let stored = body["password_hash"].as_str().unwrap();
        assert!(verify_password("StrongPass", stored));
    }
}
