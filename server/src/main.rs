//! Catering API server.
//!
//! Run from repo root: `cargo run -p catering-server`

use catering_api::{app, apply_migrations, ensure_database_exists, AppConfig, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("catering_api=info,catering_server=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    let bind_addr = config.bind_addr.clone();
    let auto_migrate = config.auto_migrate;
    let state = AppState::new(pool, config);
    if auto_migrate {
        apply_migrations(&state.pool, &state.model).await?;
    }

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("catering API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
