use std::sync::Arc;

use stockroom_api::config;
use stockroom_api::database::DatabaseManager;
use stockroom_api::provider::{DataProvider, MemoryProvider, PgProvider};
use stockroom_api::{app, logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SUPABASE_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config::config().clone();
    logging::init(&config.logging);
    tracing::info!("Starting Stockroom API in {:?} mode", config.environment);

    let provider: Arc<dyn DataProvider> = if std::env::args().any(|a| a == "--memory") {
        if !stockroom_api::is_development!() {
            anyhow::bail!("--memory is only available in development");
        }
        tracing::warn!("serving from an empty in-memory store; nothing is persisted");
        Arc::new(MemoryProvider::new())
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        Arc::new(PgProvider::new(pool).with_query_logging(config.database.enable_query_logging))
    };

    if config.auth.jwt_secret.is_empty() {
        tracing::warn!("SUPABASE_JWT_SECRET is not set; requests carrying a session token will fail");
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Stockroom API listening");

    axum::serve(listener, app(AppState::new(config, provider))).await?;
    Ok(())
}
