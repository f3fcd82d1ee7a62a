//! Catalog schema migration tool
//!
//! Applies the SQL migrations to the configured database.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/catalog cargo run --bin catalog-migrate
//! ```
//!
//! # Environment Variables
//!
//! * `DATABASE_URL` - PostgreSQL connection string (required)
//! * `DATABASE_MIGRATIONS_DIR` - Migration directory (default: migrations)
//! * `LOG_LEVEL` - trace, debug, info, warn, error (default: info; `RUST_LOG` wins)

use anyhow::Context;
use infra_db::{create_pool, run_migrations, DatabaseConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level);

    let config = DatabaseConfig::from_env().context("loading DATABASE_* configuration")?;
    let migrations_dir = config.migrations_dir.clone();

    let pool = create_pool(config).await.context("connecting to database")?;
    run_migrations(&pool, &migrations_dir)
        .await
        .with_context(|| format!("applying migrations from {}", migrations_dir.display()))?;

    pool.close().await;
    tracing::info!("Migration complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
