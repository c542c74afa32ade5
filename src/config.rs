//! Runtime configuration read from the environment (optionally seeded from `.env`).

use crate::error::ConfigError;
use jsonwebtoken::Algorithm;
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/catering";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_TOKEN_MINUTES: i64 = 15;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    /// Request body cap in bytes.
    pub body_limit_bytes: usize,
    /// Create missing tables from the entity catalog on startup.
    pub auto_migrate: bool,
    pub auth: AuthConfig,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_minutes: i64,
}

impl AppConfig {
    /// Read configuration from process environment. `SECRET_KEY` is mandatory.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("SECRET_KEY"))?;
        let algorithm = parse_algorithm(lookup("ALGORITHM").as_deref().unwrap_or("HS256"))?;

        Ok(AppConfig {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 5)?,
            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", lookup("BODY_LIMIT_BYTES"), 1024 * 1024)?,
            auto_migrate: parse_or("AUTO_MIGRATE", lookup("AUTO_MIGRATE"), true)?,
            auth: AuthConfig {
                secret_key,
                algorithm,
                access_token_minutes: parse_or(
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    lookup("ACCESS_TOKEN_EXPIRE_MINUTES"),
                    DEFAULT_TOKEN_MINUTES,
                )?,
            },
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(s) if s.trim().is_empty() => Ok(default),
        Some(s) => s.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: format!("{} ({})", s, e),
        }),
    }
}

/// Only HMAC algorithms are usable with a shared secret.
fn parse_algorithm(s: &str) -> Result<Algorithm, ConfigError> {
    match s.trim().to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::Invalid {
            key: "ALGORITHM",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[("SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.db_max_connections, 5);
        assert!(cfg.auto_migrate);
        assert_eq!(cfg.auth.algorithm, Algorithm::HS256);
        assert_eq!(cfg.auth.access_token_minutes, 15);
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SECRET_KEY")));
    }

    #[test]
    fn parses_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SECRET_KEY", "k"),
            ("ALGORITHM", "hs512"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "60"),
            ("DB_MAX_CONNECTIONS", "20"),
            ("AUTO_MIGRATE", "false"),
        ]))
        .unwrap();
        assert_eq!(cfg.auth.algorithm, Algorithm::HS512);
        assert_eq!(cfg.auth.access_token_minutes, 60);
        assert_eq!(cfg.db_max_connections, 20);
        assert!(!cfg.auto_migrate);
    }

    #[test]
    fn rejects_asymmetric_algorithm_and_bad_numbers() {
        assert!(AppConfig::from_lookup(lookup(&[("SECRET_KEY", "k"), ("ALGORITHM", "RS256")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("SECRET_KEY", "k"), ("DB_MAX_CONNECTIONS", "many")])).is_err());
    }
}
