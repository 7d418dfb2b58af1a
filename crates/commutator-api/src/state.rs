//! Application state and sub-state extractors.
//!
//! AppState is split into sub-states so handlers can extract only what they need via
//! Axum's `FromRef`.

use axum::extract::FromRef;
use commutator_core::{Config, TenantRegistry};
use commutator_db::{ConsentRepository, Database, OrderRepository};
use commutator_infra::CsrfConfig;
use commutator_services::Dispatcher;
use commutator_storage::FileStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Database handle plus the two audit repositories.
#[derive(Clone)]
pub struct DbState {
    pub database: Database,
    pub orders: OrderRepository,
    pub consents: ConsentRepository,
}

impl DbState {
    pub fn new(database: Database) -> Self {
        let pool = database.pool().clone();
        Self {
            orders: OrderRepository::new(pool.clone()),
            consents: ConsentRepository::new(pool),
            database,
        }
    }
}

/// Everything needed to turn an accepted order into notifications.
#[derive(Clone)]
pub struct DeliveryState {
    pub registry: Arc<TenantRegistry>,
    pub dispatcher: Dispatcher,
    pub uploads: FileStore,
}

pub struct AppState {
    pub config: Config,
    pub db: DbState,
    pub delivery: DeliveryState,
    pub csrf: CsrfConfig,
    /// Cancelled on shutdown; background loops watch it.
    pub background: CancellationToken,
}

impl AppState {
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }
}

impl FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl FromRef<Arc<AppState>> for DeliveryState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.delivery.clone()
    }
}
