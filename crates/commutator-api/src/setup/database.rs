//! Database setup and initialization

use anyhow::{Context, Result};
use commutator_core::Config;
use commutator_db::Database;
use std::path::Path;

/// Open the SQLite file and apply pending migrations.
pub async fn setup_database(config: &Config) -> Result<Database> {
    tracing::info!(path = %config.db_path(), "Opening database...");

    let database = Database::open(Path::new(config.db_path()), config.db_max_connections())
        .await
        .context("Failed to open database")?;

    database
        .migrate()
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(database)
}
