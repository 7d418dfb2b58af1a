use commutator_storage::SweepReport;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// One-line summary of a sweep pass.
pub fn format_report(report: &SweepReport) -> String {
    format!(
        "scanned {}, deleted {}, skipped {}, failed {}",
        report.scanned, report.deleted, report.skipped, report.failed
    )
}
