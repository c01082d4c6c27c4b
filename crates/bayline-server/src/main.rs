//! Bayline Server — Application entry point.

use bayline_db::{DbConfig, DbManager, run_migrations};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("bayline=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Bayline server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(err) = run_migrations(manager.client()).await {
        tracing::error!(error = %err, "Failed to run migrations");
        std::process::exit(1);
    }

    // TODO: Start REST API server (transport layer is owned by a
    // separate crate and not wired in yet).

    tracing::info!("Bayline server stopped.");
}
