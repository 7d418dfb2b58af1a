//! Deletes stale files from the order upload directory.
//!
//! Runs alongside (or instead of) the in-process sweep, e.g. from cron with `--once`.

use anyhow::{Context, Result};
use clap::Parser;
use commutator_cli::{format_report, init_tracing};
use commutator_infra::TempSweepService;
use commutator_storage::cleanup_older_than;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "temp_sweep")]
#[command(about = "Delete temp upload files older than a given age")]
struct Args {
    /// Directory to sweep
    #[arg(long, env = "TEMP_STORAGE_DIR", default_value = "app/storage/temp")]
    dir: PathBuf,

    /// Minimum file age, in seconds, before deletion
    #[arg(long, env = "TEMP_FILE_TTL_SECS", default_value = "86400")]
    older_than_secs: u64,

    /// Seconds between passes when running continuously
    #[arg(long, default_value = "3600")]
    interval_secs: u64,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let max_age = Duration::from_secs(args.older_than_secs);

    if args.once {
        let report = cleanup_older_than(&args.dir, max_age)
            .await
            .with_context(|| format!("Failed to sweep {}", args.dir.display()))?;
        println!("{}: {}", args.dir.display(), format_report(&report));
        return Ok(());
    }

    if args.interval_secs == 0 {
        anyhow::bail!("--interval-secs must be greater than 0 (use --once for a single pass)");
    }

    tracing::info!(
        dir = %args.dir.display(),
        older_than_secs = args.older_than_secs,
        interval_secs = args.interval_secs,
        "Starting temp sweep"
    );

    let shutdown = CancellationToken::new();
    let service = Arc::new(TempSweepService::new(
        args.dir,
        max_age,
        Duration::from_secs(args.interval_secs),
    ));
    let handle = service.start(shutdown.child_token());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    tracing::info!("Stopping temp sweep");
    shutdown.cancel();
    handle.await.context("Sweep task panicked")?;

    Ok(())
}
