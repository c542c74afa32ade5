//! Shared application state for all routes.

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::model::{build_catalog, Catalog};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<Catalog>,
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let jwt = JwtKeys::new(&config.auth);
        AppState {
            pool,
            model: Arc::new(build_catalog()),
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}
