//! SurrealDB connection management.
//!
//! One authenticated WebSocket session is opened at startup and shared
//! by every repository; the engine never reconnects mid-request.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Connection settings for the Bayline database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint as `host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials; repositories enforce tenant scoping themselves.
    pub username: String,
    pub password: String,
}

impl DbConfig {
    /// Build the configuration from `BAYLINE_DB_*` environment
    /// variables, falling back to the local-development defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("BAYLINE_DB_URL", defaults.url),
            namespace: env_or("BAYLINE_DB_NS", defaults.namespace),
            database: env_or("BAYLINE_DB_NAME", defaults.database),
            username: env_or("BAYLINE_DB_USER", defaults.username),
            password: env_or("BAYLINE_DB_PASS", defaults.password),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "bayline".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns the authenticated SurrealDB session handed to repositories.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the WebSocket connection, authenticate and select the
    /// configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "opening SurrealDB connection"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("SurrealDB session ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
