//! Service initialization and application state setup

use crate::state::{AppState, DbState, DeliveryState};
use anyhow::{Context, Result};
use commutator_core::{Config, TenantRegistry};
use commutator_db::Database;
use commutator_infra::{CsrfConfig, TempSweepService};
use commutator_services::{Dispatcher, SmtpEmailSender, TelegramNotifier};
use commutator_storage::{FileStore, FileStoreConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Build the production channels and the application state.
pub async fn initialize_services(
    config: &Config,
    database: Database,
    registry: TenantRegistry,
) -> Result<Arc<AppState>> {
    let chat = TelegramNotifier::new(config.chat_api_base_url())
        .context("Failed to create chat-bot client")?;
    let dispatcher = Dispatcher::new(Arc::new(SmtpEmailSender::new()), Arc::new(chat));

    build_state(config, database, registry, dispatcher).await
}

/// Assemble [`AppState`] around an already-built dispatcher and start background work.
pub async fn build_state(
    config: &Config,
    database: Database,
    registry: TenantRegistry,
    dispatcher: Dispatcher,
) -> Result<Arc<AppState>> {
    let uploads = FileStore::new(FileStoreConfig::new(
        config.temp_storage_dir(),
        config.max_file_size_bytes(),
        config.temp_file_ttl(),
    ))
    .await
    .context("Failed to initialize temp file store")?;

    tracing::info!(
        dir = %uploads.dir().display(),
        max_file_size = uploads.max_file_size(),
        ttl_secs = uploads.ttl().as_secs(),
        "Temp file store ready"
    );

    let background = CancellationToken::new();

    // Catches files whose deferred deletion never ran (crash, restart, abandoned timer).
    if let Some(every) = config.temp_sweep_interval() {
        let sweep = Arc::new(TempSweepService::new(
            config.temp_storage_dir(),
            config.temp_file_ttl(),
            every,
        ));
        sweep.start(background.child_token());
        tracing::info!(interval_secs = every.as_secs(), "Temp directory sweep started");
    }

    Ok(Arc::new(AppState {
        config: config.clone(),
        db: DbState::new(database),
        delivery: DeliveryState {
            registry: Arc::new(registry),
            dispatcher,
            uploads,
        },
        csrf: CsrfConfig::new(config.csrf_secret(), config.is_production()),
        background,
    }))
}
