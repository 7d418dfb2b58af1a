//! Periodic sweep of the temp upload directory.

use commutator_storage::cleanup_older_than;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

/// Deletes temp files older than `max_age` every `every`, until cancelled.
#[derive(Debug, Clone)]
pub struct TempSweepService {
    dir: PathBuf,
    max_age: Duration,
    every: Duration,
}

impl TempSweepService {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, every: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            every,
        }
    }

    /// Start the background sweep; the first pass runs immediately.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.every);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Temp sweep stopped");
                        break;
                    }
                    _ = sweep_interval.tick() => self.run_once().await,
                }
            }
        })
    }

    #[tracing::instrument(skip(self), fields(cleanup.operation = "temp_sweep", dir = %self.dir.display()))]
    pub async fn run_once(&self) {
        match cleanup_older_than(&self.dir, self.max_age).await {
            Ok(report) => tracing::debug!(
                scanned = report.scanned,
                deleted = report.deleted,
                skipped = report.skipped,
                failed = report.failed,
                "Temp sweep completed"
            ),
            Err(e) => tracing::error!(error = %e, "Temp sweep failed"),
        }
    }
}
