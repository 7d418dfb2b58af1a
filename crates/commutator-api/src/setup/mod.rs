//! Application setup and initialization
//!
//! Everything `main` does before serving lives here so that integration tests can
//! assemble the same state and router.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use commutator_core::{Config, TenantRegistry};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    commutator_infra::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    crate::error::hide_error_details(config.is_production());

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    // Tenants are read once; the registry never changes afterwards.
    let registry = TenantRegistry::from_env();
    if registry.is_empty() {
        tracing::warn!("No tenant services configured; every order will be rejected");
    } else {
        tracing::info!(
            tenants = registry.len(),
            names = %registry.names().join(","),
            "Tenant registry built"
        );
    }

    let database = database::setup_database(&config).await?;

    let state = services::initialize_services(&config, database, registry).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
