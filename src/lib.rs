//! Catering API: REST backend for customers, events, orders, payments, products,
//! invoices and contracts over PostgreSQL, with JWT bearer authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::AppConfig;
pub use error::{AppError, ConfigError};
pub use migration::{apply_migrations, ensure_database_exists};
pub use model::{build_catalog, Catalog, EntityKind};
pub use routes::app;
pub use service::CrudService;
pub use state::AppState;
