//! Request validation from catalog rules.

use crate::error::AppError;
use crate::model::{FieldFormat, ValidationRule};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const EMAIL_FORMAT_MESSAGE: &str = "The email must be in the format 'name@domain.com' or 'name@domain.br'.";

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.(com|br)$").unwrap())
}

fn cpf_cnpj_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{3}\.\d{3}\.\d{3}-\d{2}|\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2})$").unwrap())
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-column rules. All required fields must be present.
    /// Rules are checked in column-name order so the reported field is stable.
    pub fn validate(
        body: &HashMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        let mut cols: Vec<&String> = rules.keys().collect();
        cols.sort();
        for col in cols {
            let rule = &rules[col];
            let val = body.get(col);
            if rule.required && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for updates). Required fields may be
    /// omitted but not nulled out.
    pub fn validate_partial(
        body: &HashMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        let mut cols: Vec<&String> = body.keys().collect();
        cols.sort();
        for col in cols {
            let Some(rule) = rules.get(col) else { continue };
            let v = &body[col];
            if rule.required && v.is_null() {
                return Err(AppError::Validation(format!("{} cannot be null", col)));
            }
            validate_field(col, v, rule)?;
        }
        Ok(())
    }
}

/// Numeric view of a JSON value: numbers as-is, strings when they parse as a finite number.
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn is_timestamp(s: &str) -> bool {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = rule.format {
        validate_format(col, v, format)?;
    } else if !v.is_string() {
        return Err(AppError::Validation(format!("{} must be a string", col)));
    }
    if let Some(s) = v.as_str() {
        let len = s.trim().chars().count();
        if let Some(max) = rule.max_length {
            if s.chars().count() > max {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min {
                return Err(AppError::Validation(if min == 1 {
                    format!("{} cannot be empty", col)
                } else {
                    format!("{} must be at least {} characters", col, min)
                }));
            }
        }
        if let Some(ref allowed) = rule.allowed {
            if !allowed.iter().any(|a| a == s) {
                return Err(AppError::Validation(format!(
                    "{} must be one of: {}",
                    col,
                    allowed.join(", ")
                )));
            }
        }
    }
    if let Some(n) = as_number(v).filter(|_| matches!(rule.format, Some(FieldFormat::Integer | FieldFormat::Number))) {
        if let Some(min) = rule.exclusive_minimum {
            if n <= min {
                return Err(AppError::Validation(format!("{} must be greater than {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: FieldFormat) -> Result<(), AppError> {
    let ok = match format {
        FieldFormat::Integer => v.as_i64().is_some(),
        FieldFormat::Number => as_number(v).is_some(),
        FieldFormat::Boolean => v.is_boolean(),
        FieldFormat::Timestamp => v.as_str().map_or(false, is_timestamp),
        FieldFormat::Email => {
            if !v.as_str().map_or(false, |s| email_re().is_match(s)) {
                return Err(AppError::Validation(EMAIL_FORMAT_MESSAGE.into()));
            }
            true
        }
        FieldFormat::CpfCnpj => v.as_str().map_or(false, |s| cpf_cnpj_re().is_match(s)),
    };
    if ok {
        return Ok(());
    }
    let expected = match format {
        FieldFormat::Integer => "an integer",
        FieldFormat::Number => "a number",
        FieldFormat::Boolean => "a boolean",
        FieldFormat::Timestamp => "a valid date or datetime",
        FieldFormat::Email => "a valid email",
        FieldFormat::CpfCnpj => "a formatted CPF (000.000.000-00) or CNPJ (00.000.000/0000-00)",
    };
    Err(AppError::Validation(format!("{} must be {}", col, expected)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_catalog, EntityKind};
    use serde_json::json;

    fn body(v: Value) -> HashMap<String, Value> {
        v.as_object().unwrap().clone().into_iter().collect()
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn valid_payment() -> Value {
        json!({
            "order_id": 3001,
            "amount": "3500.00",
            "payment_method": "pix",
            "status": "approved",
            "payment_date": "2025-03-01T10:30:00.123456"
        })
    }

    #[test]
    fn accepts_valid_payment() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Payments).validation;
        RequestValidator::validate(&body(valid_payment()), rules).unwrap();
    }

    #[test]
    fn rejects_values_outside_enumeration() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Payments).validation;
        let mut p = body(valid_payment());
        p.insert("payment_method".into(), json!("crypto"));
        let msg = message(RequestValidator::validate(&p, rules).unwrap_err());
        assert_eq!(msg, "payment_method must be one of: credit_card, pix, boleto, bank_transfer");
    }

    #[test]
    fn rejects_non_positive_and_non_numeric_amounts() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Payments).validation;
        let mut p = body(valid_payment());
        p.insert("amount".into(), json!(0));
        assert_eq!(message(RequestValidator::validate(&p, rules).unwrap_err()), "amount must be greater than 0");
        p.insert("amount".into(), json!("invalid_amount"));
        assert_eq!(message(RequestValidator::validate(&p, rules).unwrap_err()), "amount must be a number");
    }

    #[test]
    fn rejects_bad_dates_and_ids() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Payments).validation;
        let mut p = body(valid_payment());
        p.insert("payment_date".into(), json!("invalid-date"));
        assert_eq!(
            message(RequestValidator::validate(&p, rules).unwrap_err()),
            "payment_date must be a valid date or datetime"
        );
        let mut p = body(valid_payment());
        p.insert("order_id".into(), json!("invalid_id"));
        assert_eq!(message(RequestValidator::validate(&p, rules).unwrap_err()), "order_id must be an integer");
    }

    #[test]
    fn required_fields_must_be_present() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Customers).validation;
        let partial = body(json!({"full_name": "Alvaro Ribeiro", "email": "alvaro@inatel.br"}));
        assert_eq!(message(RequestValidator::validate(&partial, rules).unwrap_err()), "address is required");
    }

    #[test]
    fn customer_formats() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Customers).validation;
        let good = json!({
            "full_name": "Alvaro Ribeiro",
            "email": "alvaro@inatel.br",
            "phone": "35 99988-7766",
            "address": "Rua Joao de Camargo, 510",
            "cpf_cnpj": "123.456.789-09",
            "password_hash": "$argon2id$...",
            "role": "customer"
        });
        RequestValidator::validate(&body(good.clone()), rules).unwrap();

        let mut c = body(good.clone());
        c.insert("cpf_cnpj".into(), json!("12.345.678/0001-95"));
        RequestValidator::validate(&c, rules).unwrap();
        c.insert("cpf_cnpj".into(), json!("invalid_cpf"));
        assert!(message(RequestValidator::validate(&c, rules).unwrap_err()).starts_with("cpf_cnpj must be"));

        let mut c = body(good);
        for bad in ["alvaro@invalid", "user@domain.org", "@missinguser.com", "invalid-email"] {
            c.insert("email".into(), json!(bad));
            assert_eq!(message(RequestValidator::validate(&c, rules).unwrap_err()), EMAIL_FORMAT_MESSAGE);
        }
    }

    #[test]
    fn partial_validation_skips_missing_but_rejects_nulls() {
        let catalog = build_catalog();
        let rules = &catalog.entity(EntityKind::Events).validation;
        RequestValidator::validate_partial(&body(json!({"guest_count": 80, "unknown": 1})), rules).unwrap();
        assert_eq!(
            message(RequestValidator::validate_partial(&body(json!({"location": null})), rules).unwrap_err()),
            "location cannot be null"
        );
        assert_eq!(
            message(RequestValidator::validate_partial(&body(json!({"guest_count": -3})), rules).unwrap_err()),
            "guest_count must be greater than 0"
        );
        assert_eq!(
            message(RequestValidator::validate_partial(&body(json!({"location": "   "})), rules).unwrap_err()),
            "location cannot be empty"
        );
    }

    #[test]
    fn values_beyond_column_range_are_rejected() {
        let catalog = build_catalog();
        let events = &catalog.entity(EntityKind::Events).validation;
        assert_eq!(
            message(RequestValidator::validate_partial(&body(json!({"guest_count": 3000000000u64})), events).unwrap_err()),
            "guest_count must be at most 2147483647"
        );
        RequestValidator::validate_partial(&body(json!({"guest_count": 2147483647})), events).unwrap();

        let orders = &catalog.entity(EntityKind::Orders).validation;
        let order = |amount: Value| body(json!({"event_id": 1, "total_amount": amount}));
        assert_eq!(
            message(RequestValidator::validate(&order(json!(1e15)), orders).unwrap_err()),
            "total_amount must be at most 9999999999.99"
        );
        assert_eq!(
            message(RequestValidator::validate(&order(json!("10000000000")), orders).unwrap_err()),
            "total_amount must be at most 9999999999.99"
        );
        RequestValidator::validate(&order(json!("9999999999.99")), orders).unwrap();
        assert_eq!(
            message(RequestValidator::validate(&body(json!({"event_id": 4294967296u64, "total_amount": 10})), orders).unwrap_err()),
            "event_id must be at most 2147483647"
        );
    }

    #[test]
    fn timestamps_accept_common_shapes() {
        assert!(is_timestamp("2025-12-20 18:00:00"));
        assert!(is_timestamp("2025-12-20T18:00:00Z"));
        assert!(is_timestamp("2025-12-20T18:00:00.123456"));
        assert!(is_timestamp("2025-12-20"));
        assert!(!is_timestamp("20/12/2025"));
    }
}
