//! Directory sweep for temp files that outlived every other deletion path
//! (process restarts, abandoned timers).

use crate::local::remove_if_exists;
use crate::traits::StorageResult;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::fs;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Delete regular files in `dir` whose modification time is older than `max_age`.
///
/// Only listing the directory itself can fail; per-entry problems are logged and counted.
#[tracing::instrument(fields(dir = %dir.display(), max_age_secs = max_age.as_secs()))]
pub async fn cleanup_older_than(dir: &Path, max_age: Duration) -> StorageResult<SweepReport> {
    let mut report = SweepReport::default();
    let now = SystemTime::now();
    let mut entries = fs::read_dir(dir).await?;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read directory entry");
                report.failed += 1;
                break;
            }
        };
        report.scanned += 1;
        let path = entry.path();

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                report.skipped += 1;
                continue;
            }
        };
        if !metadata.is_file() {
            report.skipped += 1;
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "No modification time");
                report.skipped += 1;
                continue;
            }
        };
        // Future mtimes (clock skew) count as fresh.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        match remove_if_exists(&path).await {
            Ok(true) => {
                tracing::debug!(path = %path.display(), age_secs = age.as_secs(), "Deleted stale temp file");
                report.deleted += 1;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete stale temp file");
                report.failed += 1;
            }
        }
    }

    if report.deleted > 0 || report.failed > 0 {
        tracing::info!(
            scanned = report.scanned,
            deleted = report.deleted,
            failed = report.failed,
            "Temp directory sweep finished"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn deletes_only_old_regular_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("old.pdf"), b"%PDF-old").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        tokio::time::sleep(Duration::from_millis(1200)).await;
        std::fs::write(dir.path().join("fresh.pdf"), b"%PDF-new").unwrap();

        let report = cleanup_older_than(dir.path(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.skipped, 1);
        assert!(!dir.path().join("old.pdf").exists());
        assert!(dir.path().join("fresh.pdf").exists());
        assert!(dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn empty_directory_reports_nothing() {
        let dir = TempDir::new().unwrap();
        let report = cleanup_older_than(dir.path(), Duration::ZERO).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = cleanup_older_than(&dir.path().join("absent"), Duration::ZERO).await;
        assert!(result.is_err());
    }
}
